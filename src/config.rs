use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "ESG_REPORT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "esg_report.toml";

/// File names of each source inside `data_dir`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceFiles {
    pub snapshot: String,
    pub narrative: String,
    pub invoices: String,
    pub uploaded_dataset: String,
    pub context: String,
    pub environmental_insights: String,
    pub social_insights: String,
    pub governance_insights: String,
    pub platform: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            snapshot: "esg_data.json".to_string(),
            narrative: "esg_mini_report.json".to_string(),
            invoices: "invoices.json".to_string(),
            uploaded_dataset: "uploaded_dataset.csv".to_string(),
            context: "context.json".to_string(),
            environmental_insights: "environmental_insights.json".to_string(),
            social_insights: "social_insights.json".to_string(),
            governance_insights: "governance_insights.json".to_string(),
            platform: "platform_overview.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub sources: SourceFiles,
    /// Tonnes CO2e per kWh for invoices that carry neither tonnage nor a
    /// factor of their own.
    pub default_emission_factor: f64,
    pub energy_columns: Vec<String>,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            sources: SourceFiles::default(),
            default_emission_factor: 0.000_95,
            energy_columns: vec!["Electricity (kWh)".to_string(), "Energy (kWh)".to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn source_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|reason| ConfigError::Toml {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Read a config file. A missing file is not an error; it yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(reason) => Err(ConfigError::Io {
                path: path.display().to_string(),
                reason,
            }),
        }
    }

    /// Config path from `ESG_REPORT_CONFIG`, else `esg_report.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
