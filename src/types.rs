use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

pub const TOTAL_ENERGY_CONSUMPTION: &str = "totalEnergyConsumption";
pub const CARBON_EMISSIONS: &str = "carbonEmissions";
pub const RENEWABLE_ENERGY_SHARE: &str = "renewableEnergyShare";
pub const SUPPLIER_DIVERSITY: &str = "supplierDiversity";
pub const CUSTOMER_SATISFACTION: &str = "customerSatisfaction";
pub const HUMAN_CAPITAL: &str = "humanCapital";
pub const CORPORATE_GOVERNANCE: &str = "corporateGovernance";
pub const ISO_9001_COMPLIANCE: &str = "iso9001Compliance";
pub const BUSINESS_ETHICS: &str = "businessEthics";
pub const TOTAL_COMPLIANCE_FINDINGS: &str = "totalComplianceFindings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pillar {
    Environmental,
    Social,
    Governance,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [Pillar::Environmental, Pillar::Social, Pillar::Governance];

    pub fn key(&self) -> &'static str {
        match self {
            Pillar::Environmental => "environmental",
            Pillar::Social => "social",
            Pillar::Governance => "governance",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Pillar::Environmental => "Environmental",
            Pillar::Social => "Social",
            Pillar::Governance => "Governance",
        }
    }
}

/// Named numeric fields for one pillar. A missing key means "unknown",
/// never zero, and every stored value is finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PillarSummary {
    fields: BTreeMap<String, f64>,
}

impl PillarSummary {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied()
    }

    /// Store a known value, or forget the key when the value is unknown or
    /// not finite.
    pub fn set(&mut self, key: &str, value: Option<f64>) {
        match value.filter(|v| v.is_finite()) {
            Some(v) => {
                self.fields.insert(key.to_string(), v);
            }
            None => {
                self.fields.remove(key);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, f64)> for PillarSummary {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut summary = PillarSummary::default();
        for (k, v) in iter {
            summary.set(&k, Some(v));
        }
        summary
    }
}

/// The four financial/physical scalars shown on the headline cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarMetric {
    CarbonTax,
    TaxAllowances,
    CarbonCredits,
    EnergySavings,
}

impl ScalarMetric {
    pub const ALL: [ScalarMetric; 4] = [
        ScalarMetric::CarbonTax,
        ScalarMetric::TaxAllowances,
        ScalarMetric::CarbonCredits,
        ScalarMetric::EnergySavings,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ScalarMetric::CarbonTax => "carbonTax",
            ScalarMetric::TaxAllowances => "taxAllowances",
            ScalarMetric::CarbonCredits => "carbonCredits",
            ScalarMetric::EnergySavings => "energySavings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScalarMetric::CarbonTax => "Carbon Tax Exposure",
            ScalarMetric::TaxAllowances => "Tax Allowances",
            ScalarMetric::CarbonCredits => "Carbon Credits",
            ScalarMetric::EnergySavings => "Energy Savings",
        }
    }
}

/// Scalars that always have a value; unknown reads as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub carbon_tax: f64,
    pub tax_allowances: f64,
    pub carbon_credits: f64,
    pub energy_savings: f64,
}

impl MetricSet {
    pub fn get(&self, metric: ScalarMetric) -> f64 {
        match metric {
            ScalarMetric::CarbonTax => self.carbon_tax,
            ScalarMetric::TaxAllowances => self.tax_allowances,
            ScalarMetric::CarbonCredits => self.carbon_credits,
            ScalarMetric::EnergySavings => self.energy_savings,
        }
    }

    pub fn set(&mut self, metric: ScalarMetric, value: f64) {
        let slot = match metric {
            ScalarMetric::CarbonTax => &mut self.carbon_tax,
            ScalarMetric::TaxAllowances => &mut self.tax_allowances,
            ScalarMetric::CarbonCredits => &mut self.carbon_credits,
            ScalarMetric::EnergySavings => &mut self.energy_savings,
        };
        *slot = if value.is_finite() { value } else { 0.0 };
    }
}

// ---------- raw payloads (lenient: every field may be missing or malformed) ----------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    #[serde(rename = "mockData")]
    pub mock_data: Option<Value>,
    pub summary: Option<Value>,
    pub metrics: Option<Value>,
    pub insights: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawNarrative {
    pub baseline: Option<Value>,
    pub benchmark: Option<Value>,
    pub performance_vs_benchmark: Option<Value>,
    pub ai_recommendations: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawInvoice {
    #[serde(alias = "invoice_date", alias = "period")]
    pub date: Option<Value>,
    #[serde(alias = "energyKwh", alias = "kwh")]
    pub energy_kwh: Option<Value>,
    #[serde(alias = "carbonTonnes")]
    pub carbon_tonnes: Option<Value>,
    #[serde(alias = "emissionFactor")]
    pub emission_factor: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawContext {
    #[serde(rename = "energyUsage")]
    pub energy_usage: Option<Value>,
    #[serde(rename = "energyUse")]
    pub energy_use: Option<Value>,
    pub production: Option<Value>,
    #[serde(rename = "environmentalBenchmarks")]
    pub environmental_benchmarks: Option<Value>,
    #[serde(rename = "environmentalInsights")]
    pub environmental_insights: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPillarInsights {
    pub insights: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPlatformStats {
    pub countries_supported: Option<Value>,
    pub esg_reports_generated: Option<Value>,
    pub compliance_accuracy: Option<Value>,
    pub ai_support_mode: Option<Value>,
}

// ---------- typed sources ----------

/// Platform headline figures. Fields missing from the payload keep these
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub countries_supported: u64,
    pub esg_reports_generated: u64,
    /// Fraction in `0..=1`.
    pub compliance_accuracy: f64,
    pub ai_support_mode: String,
}

impl Default for PlatformStats {
    fn default() -> Self {
        Self {
            countries_supported: 50,
            esg_reports_generated: 10_000,
            compliance_accuracy: 0.99,
            ai_support_mode: "24/7".to_string(),
        }
    }
}

/// Backend-computed summary snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendSnapshot {
    pub environmental: PillarSummary,
    pub social: PillarSummary,
    pub governance: PillarSummary,
    pub metrics: MetricSet,
    pub insights: Vec<String>,
}

/// Simulation/context aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextAggregate {
    /// `None` when the payload has no usable series at all.
    pub energy_usage: Option<Vec<f64>>,
    pub energy_use: Vec<f64>,
    pub production: Vec<f64>,
    pub benchmark_intensity: Option<f64>,
    pub environmental_insights: Vec<String>,
}

/// One row of an uploaded dataset, keyed by column header.
pub type UploadedRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NarrativeReport {
    pub baseline: String,
    pub benchmark: String,
    pub performance_vs_benchmark: String,
    pub ai_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PillarInsights {
    pub insights: Vec<String>,
}

/// One billing period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceRecord {
    pub date: Option<NaiveDate>,
    pub energy_kwh: Option<f64>,
    pub carbon_tonnes: Option<f64>,
    pub emission_factor: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub total_energy_kwh: Option<f64>,
    pub total_carbon_tonnes: Option<f64>,
}

// ---------- engine output ----------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedSnapshot {
    pub environmental: PillarSummary,
    pub social: PillarSummary,
    pub governance: PillarSummary,
    pub metrics: MetricSet,
    pub insights: Vec<String>,
}

impl ResolvedSnapshot {
    pub fn pillar(&self, pillar: Pillar) -> &PillarSummary {
        match pillar {
            Pillar::Environmental => &self.environmental,
            Pillar::Social => &self.social,
            Pillar::Governance => &self.governance,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub intensity: Vec<f64>,
    pub baseline: Option<f64>,
    pub current: Option<f64>,
    pub benchmark: Option<f64>,
    pub delta: Option<f64>,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub metric: ScalarMetric,
    pub current: f64,
    pub previous: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub percent: Option<f64>,
}

// ---------- report rows ----------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PillarMetricRow {
    #[serde(rename = "Pillar")]
    #[tabled(rename = "Pillar")]
    pub pillar: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct IntensityRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "EnergyUseMWh")]
    #[tabled(rename = "EnergyUseMWh")]
    pub energy_use: String,
    #[serde(rename = "ProductionTonnes")]
    #[tabled(rename = "ProductionTonnes")]
    pub production: String,
    #[serde(rename = "IntensityMWhPerTonne")]
    #[tabled(rename = "IntensityMWhPerTonne")]
    pub intensity: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "Previous")]
    #[tabled(rename = "Previous")]
    pub previous: String,
    #[serde(rename = "Direction")]
    #[tabled(rename = "Direction")]
    pub direction: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RedFlagRow {
    #[serde(rename = "No")]
    #[tabled(rename = "No")]
    pub no: usize,
    #[serde(rename = "RedFlag")]
    #[tabled(rename = "RedFlag")]
    pub flag: String,
}
