use esg_report::config::EngineConfig;
use esg_report::engine::{CommitOutcome, Engine};
use esg_report::loader::fetch_sources;
use esg_report::reports;
use esg_report::types::{PlatformStats, CARBON_EMISSIONS, TOTAL_ENERGY_CONSUMPTION};
use serde_json::json;
use std::path::Path;

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    write(dir, name, &value.to_string());
}

fn config_for(dir: &Path) -> EngineConfig {
    EngineConfig {
        data_dir: dir.to_path_buf(),
        output_dir: dir.join("out"),
        default_emission_factor: 0.001,
        ..EngineConfig::default()
    }
}

fn seed_backend(dir: &Path, carbon_tax: f64) {
    write_json(
        dir,
        "esg_data.json",
        json!({
            "mockData": {
                "summary": {
                    "environmental": { "totalEnergyConsumption": 99999, "renewableEnergyShare": 19.9, "carbonEmissions": 12 },
                    "social": { "supplierDiversity": 8 },
                    "governance": { "totalComplianceFindings": 2, "corporateGovernance": "A" }
                },
                "metrics": { "carbonTax": carbon_tax, "energySavings": 10 }
            },
            "insights": ["snapshot insight"]
        }),
    );
}

#[test]
fn full_load_resolves_with_invoice_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    seed_backend(d, 20_000_001.0);
    write_json(
        d,
        "invoices.json",
        json!([
            { "date": "2024-01-15", "energy_kwh": 1 },
            { "date": "2024-02-15", "energy_kwh": 2 },
            { "date": "2024-03-15", "energy_kwh": 3 },
            { "date": "2024-04-15", "energy_kwh": 4 },
            { "date": "2024-05-15", "energy_kwh": 500 },
            { "date": "2024-06-15", "energy_kwh": 600 },
            { "date": "2024-07-15", "energy_kwh": 700 },
            { "date": "2024-08-15", "energy_kwh": 800, "carbon_tonnes": 2 },
            { "date": "2024-09-15", "energy_kwh": "1,000" },
            { "date": "2024-10-15", "energy_kwh": "bad" }
        ]),
    );
    write(d, "uploaded_dataset.csv", "Site,Energy (kWh)\nA,\"5,000\"\n");
    write_json(
        d,
        "context.json",
        json!({ "energyUse": [20, 30, 40], "production": [10, 10, 10] }),
    );
    write_json(d, "platform_overview.json", json!({ "countries_supported": 54 }));
    // Pillar insight feeds and the narrative are missing on purpose.

    let config = config_for(d);
    let mut engine = Engine::new(config.clone());
    let (updates, load_reports) = fetch_sources(&config);
    assert_eq!(load_reports.len(), 2);
    for update in updates {
        assert!(matches!(engine.arrive(update), CommitOutcome::Applied { .. }));
    }

    let view = engine.view().unwrap();
    let env = &view.snapshot.environmental;
    // May..Oct: 500 + 600 + 700 + 800 + 1000 + 0
    assert_eq!(env.get(TOTAL_ENERGY_CONSUMPTION), Some(3_600.0));
    let carbon = env.get(CARBON_EMISSIONS).unwrap();
    assert!((carbon - (0.5 + 0.6 + 0.7 + 2.0 + 1.0)).abs() < 1e-9);
    assert_eq!(view.provenance.energy, Some("invoices"));

    assert_eq!(view.red_flags.len(), 4);
    assert!(view.red_flags[0].contains("19.9%"));
    assert!(view.red_flags[1].contains("R 20,000,001"));
    assert!(view.red_flags[2].contains("0.3%"));
    assert!(view.red_flags[3].contains("There are 2 open compliance findings"));

    assert_eq!(view.snapshot.insights, vec!["snapshot insight"]);
    // narrative + three insight feeds are unavailable
    assert_eq!(view.section_errors.len(), 4);
    assert_eq!(view.platform.countries_supported, 54);
    assert_eq!(view.platform.ai_support_mode, "24/7");
    assert_eq!(view.energy.derived.baseline, Some(3.0));
    assert!(view.trends.iter().all(|t| t.previous.is_none()));

    let summary = reports::generate_summary(view);
    assert!(summary.attention_needed);
}

#[test]
fn uploads_used_when_invoices_fail() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    seed_backend(d, 0.0);
    write(d, "invoices.json", "{ not json");
    write(d, "uploaded_dataset.csv", "Site,Electricity (kWh)\nA,\"1,500\"\nB,500\nC,\n");

    let config = config_for(d);
    let mut engine = Engine::new(config.clone());
    let (updates, _) = fetch_sources(&config);
    for update in updates {
        engine.arrive(update);
    }
    let view = engine.view().unwrap();
    assert_eq!(
        view.snapshot.environmental.get(TOTAL_ENERGY_CONSUMPTION),
        Some(2_000.0)
    );
    // Carbon is never taken from uploads.
    assert_eq!(view.snapshot.environmental.get(CARBON_EMISSIONS), Some(12.0));
    assert!(view
        .section_errors
        .iter()
        .any(|m| m.starts_with("invoices: invalid JSON payload")));
}

#[test]
fn refresh_produces_trends() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    seed_backend(d, 100.0);
    let config = config_for(d);
    let mut engine = Engine::new(config.clone());
    for update in fetch_sources(&config).0 {
        engine.arrive(update);
    }

    seed_backend(d, 80.0);
    for update in fetch_sources(&config).0 {
        engine.arrive(update);
    }

    let rows = reports::trend_rows(&engine.view().unwrap().trends);
    let tax = rows.iter().find(|r| r.metric == "Carbon Tax Exposure").unwrap();
    assert_eq!(tax.previous, "100.00");
    assert_eq!(tax.direction, "down");
    assert_eq!(tax.change, "-20.0%");

    let savings = rows.iter().find(|r| r.metric == "Energy Savings").unwrap();
    assert_eq!(savings.direction, "flat");
    assert_eq!(savings.change, "0.0%");
}

#[test]
fn null_upload_cells_keep_the_energy_column() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    seed_backend(d, 0.0);
    write_json(
        d,
        "uploads.json",
        json!([{ "Energy (kWh)": null }, { "Energy (kWh)": 500 }]),
    );
    let mut config = config_for(d);
    config.sources.uploaded_dataset = "uploads.json".to_string();
    let mut engine = Engine::new(config.clone());
    for update in fetch_sources(&config).0 {
        engine.arrive(update);
    }
    let view = engine.view().unwrap();
    assert_eq!(
        view.snapshot.environmental.get(TOTAL_ENERGY_CONSUMPTION),
        Some(500.0)
    );
    assert_eq!(view.provenance.energy, Some("uploaded_dataset"));
}

#[test]
fn nothing_available_still_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let mut engine = Engine::new(config.clone());
    for update in fetch_sources(&config).0 {
        engine.arrive(update);
    }
    let view = engine.view().unwrap();
    assert!(view.snapshot.environmental.is_empty());
    assert!(view.red_flags.is_empty());
    assert_eq!(view.section_errors.len(), 9);
    assert_eq!(view.platform, PlatformStats::default());
    let lines = reports::summary_lines(&view.snapshot);
    assert_eq!(lines[0].1, "Energy: -- kWh · Renewables: --% · Carbon: -- tCO₂e");
}
