use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input file not found: {path}")]
    MissingInput { path: String },

    /// A strict numeric column held a value that does not parse.
    #[error("Cannot coerce column '{column}' at row {row}: {value:?}")]
    Coercion {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("Table not found: {0}")]
    MissingTable(String),

    #[error("Schema mismatch for table '{table}': expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;
