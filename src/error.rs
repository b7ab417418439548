use thiserror::Error;

#[derive(Error, Debug)]
pub enum FertiplanError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown {kind} unit '{tag}'")]
    UnknownUnit { kind: &'static str, tag: String },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Document analysis failed: {0}")]
    DocumentAnalysis(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, FertiplanError>;
