// Entry point and high-level CLI flow.
//
// - Option [1] reads every configured source into a fresh engine. Each
//   source is delivered as its own arrival, so each one triggers a pass.
// - Option [2] prints the dashboard previews and exports CSV/JSON reports.
// - Option [3] re-reads the sources into the same engine; the headline
//   scalars then show trends against the previous snapshot.
use esg_report::config::EngineConfig;
use esg_report::engine::{CommitOutcome, Engine};
use esg_report::{loader, output, reports, util};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// In-memory app state so sources are loaded once but reports can be
// generated many times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        config: EngineConfig::default(),
        engine: None,
    })
});

struct AppState {
    config: EngineConfig,
    engine: Option<Engine>,
}

fn lock_state() -> std::sync::MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle options [1] and [3]: read all sources and feed them to the engine.
fn handle_load(fresh: bool) {
    let mut state = lock_state();
    if fresh || state.engine.is_none() {
        state.engine = Some(Engine::new(state.config.clone()));
    }
    let (updates, load_reports) = loader::fetch_sources(&state.config);
    let Some(engine) = state.engine.as_mut() else {
        return;
    };

    println!("Loading ESG data sources...");
    let mut applied = 0usize;
    for update in updates {
        if let CommitOutcome::Applied { .. } = engine.arrive(update) {
            applied += 1;
        }
    }
    for (name, report) in &load_reports {
        println!(
            "{}: {} rows loaded, {} kept ({} skipped due to parse errors)",
            name,
            util::format_int(report.total_rows),
            util::format_int(report.kept_rows),
            util::format_int(report.parse_errors)
        );
    }
    if let Some(view) = engine.view() {
        for message in &view.section_errors {
            println!("Warning: {}", message);
        }
        info!(passes = applied, sequence = view.sequence, "sources loaded");
    }
    println!();
}

/// Handle option [2]: print previews and write all exports.
fn handle_generate_reports() {
    let (view, out_dir) = {
        let state = lock_state();
        let view = state.engine.as_ref().and_then(|e| e.view()).cloned();
        (view, state.config.output_dir.clone())
    };
    let Some(view) = view else {
        println!("Error: No data loaded. Please load the data sources first (option 1).\n");
        return;
    };

    println!("Generating ESG report...");
    println!("Outputs saved to {}\n", out_dir.display());
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        error!(error = %e, "unable to create output directory");
    }

    println!("Platform Overview:");
    for line in reports::platform_lines(&view.platform) {
        println!("  {}", line);
    }
    println!();

    println!("ESG Summary:");
    for (pillar, line) in reports::summary_lines(&view.snapshot) {
        println!("  {}: {}", pillar.title(), line);
    }
    println!();

    let metrics = reports::pillar_metric_rows(&view.snapshot);
    let file1 = out_dir.join("report1_esg_metrics.csv");
    if let Err(e) = output::write_csv(&file1, &metrics) {
        eprintln!("Write error: {}", e);
    }
    output::preview_section("Report 1: Resolved ESG Metrics", None, &metrics, 8);
    println!("(Full table exported to {})\n", file1.display());

    let intensity = reports::intensity_rows(&view.energy);
    let file2 = out_dir.join("report2_energy_intensity.csv");
    if let Err(e) = output::write_csv(&file2, &intensity) {
        eprintln!("Write error: {}", e);
    }
    output::preview_section(
        "Report 2: Energy Use & Intensity",
        Some("Monthly, MWh per tonne of production"),
        &intensity,
        3,
    );
    if view.energy.is_empty() {
        println!("  No monthly energy or production data loaded.");
    } else {
        for line in reports::energy_highlights(&view.energy) {
            println!("  {}", line);
        }
    }
    println!("(Full table exported to {})\n", file2.display());

    let trends = reports::trend_rows(&view.trends);
    let file3 = out_dir.join("report3_kpi_trends.csv");
    if let Err(e) = output::write_csv(&file3, &trends) {
        eprintln!("Write error: {}", e);
    }
    output::preview_section("Report 3: Headline KPI Trends", None, &trends, 4);

    let flags = reports::red_flag_rows(&view.red_flags);
    let file4 = out_dir.join("report4_red_flags.csv");
    if let Err(e) = output::write_csv(&file4, &flags) {
        eprintln!("Write error: {}", e);
    }
    output::preview_section("Report 4: ESG Red Flags", None, &flags, flags.len());

    println!("AI Analyst Summary:");
    if view.snapshot.insights.is_empty() {
        println!("  No AI analyst insights available yet.");
    }
    for note in &view.snapshot.insights {
        println!("  • {}", note);
    }
    if let Some(narrative) = &view.narrative {
        println!("\nBaseline: {}", narrative.baseline);
        println!("Benchmark: {}", narrative.benchmark);
        println!("Performance vs benchmark: {}", narrative.performance_vs_benchmark);
        for rec in &narrative.ai_recommendations {
            println!("  - {}", rec);
        }
    }
    println!();

    if let Err(e) = output::write_json(&out_dir.join("dashboard.json"), &view) {
        eprintln!("Write error: {}", e);
    }
    let summary = reports::generate_summary(&view);
    if let Err(e) = output::write_json(&out_dir.join("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"red_flags\": {}, \"attention_needed\": {}}}\n",
        summary.red_flag_count, summary.attention_needed
    );
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let path = EngineConfig::default_path();
    let (config, config_error) = match EngineConfig::load_from(&path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (EngineConfig::default(), Some(e)),
    };
    init_logging(&config.log_level);
    if let Some(e) = config_error {
        error!(error = %e, "falling back to default configuration");
    }
    lock_state().config = config;

    loop {
        println!("Select an option:");
        println!("[1] Load data sources");
        println!("[2] Generate ESG report");
        println!("[3] Refresh data sources\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(true),
            "2" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_load(false),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
