use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllowanceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Missing required column(s): {}. Found: {}",
        .missing.join(", "),
        column_list(.found)
    )]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Unknown action status: {0}")]
    InvalidStatus(String),

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AllowanceError>;

fn column_list(columns: &[String]) -> String {
    if columns.is_empty() {
        "(none)".to_string()
    } else {
        columns.join(", ")
    }
}
