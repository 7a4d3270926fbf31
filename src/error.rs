use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Invalid month key '{0}': expected YYYY-MM")]
    InvalidMonthKey(String),

    #[error("Invalid month number {0}: must be between 1 and 12")]
    InvalidMonthNumber(u32),

    #[error("No data available: {0}")]
    NoData(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
