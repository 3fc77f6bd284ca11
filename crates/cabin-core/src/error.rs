use cabin_domain::UsageId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}

/// Malformed or invariant-violating input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("final reading must be a positive number (got {0})")]
    NonPositiveReading(f64),
    #[error("final reading {final_reading} must be greater than initial reading {initial_reading}")]
    NotGreaterThanInitial {
        initial_reading: f64,
        final_reading: f64,
    },
    #[error("initial reading must be zero or greater (got {0})")]
    NegativeInitialReading(f64),
    #[error("cost per kWh must be positive (got {0})")]
    NonPositiveRate(f64),
    #[error("end date {end} is before start date {start}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// A transition attempted on a record that is no longer in the expected state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("usage {0} is already completed")]
    AlreadyCompleted(UsageId),
    #[error("home {0} already exists")]
    DuplicateHome(String),
    #[error("home {home} already has an open stay (usage {open})")]
    OpenStayExists { home: String, open: UsageId },
}

/// A referenced id or number has no matching record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("usage {0} not found")]
    Usage(UsageId),
    #[error("home {0} not found")]
    Home(String),
}
