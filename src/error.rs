use thiserror::Error;

/// Setup-time failures: bad configuration or a chart selection outside the
/// enumerated table. None of these can occur while aggregating.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown panel '{0}' (expected 1-4)")]
    UnknownPanel(String),

    #[error("unknown chart kind '{0}'")]
    UnknownChartKind(String),

    #[error("chart kind '{kind}' is not available on panel {panel}")]
    UnsupportedSelection { panel: u8, kind: String },

    #[error("duplicate chart entry for panel {panel}, kind '{kind}'")]
    DuplicateEntry { panel: u8, kind: String },

    #[error("field name for '{0}' is empty")]
    EmptyField(&'static str),

    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures while ingesting a row file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data shape: {0}")]
    InvalidShape(String),
}
