use thiserror::Error;

/// Why a data source could not be retrieved. These never escape the
/// resolution boundary; they are stored on the source slot and shown as a
/// per-section message.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name}: unable to read {path}: {reason}")]
    Io {
        source_name: &'static str,
        path: String,
        reason: std::io::Error,
    },
    #[error("{source_name}: invalid JSON payload: {reason}")]
    Json {
        source_name: &'static str,
        reason: serde_json::Error,
    },
    #[error("{source_name}: invalid CSV dataset: {reason}")]
    Csv {
        source_name: &'static str,
        reason: csv::Error,
    },
    #[error("{source_name}: unexpected payload shape ({detail})")]
    Shape {
        source_name: &'static str,
        detail: String,
    },
}

impl SourceError {
    pub fn source_name(&self) -> &'static str {
        match self {
            SourceError::Io { source_name, .. }
            | SourceError::Json { source_name, .. }
            | SourceError::Csv { source_name, .. }
            | SourceError::Shape { source_name, .. } => source_name,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {reason}")]
    Io {
        path: String,
        reason: std::io::Error,
    },
    #[error("invalid config {path}: {reason}")]
    Toml {
        path: String,
        reason: toml::de::Error,
    },
}
