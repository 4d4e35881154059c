use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Entity '{code}' not found in registry")]
    EntityNotFound { code: String },

    #[error("Advisor '{name}' not found")]
    AdvisorNotFound { name: String },
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
