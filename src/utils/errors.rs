use chrono::NaiveDate;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::locator::Role;

/// Errors that can occur while backfilling prices
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("--start-date must be YYYY-MM-DD (got '{0}')")]
    InvalidStartDate(String),

    #[error("--start-date cannot be in the future ({start} is after {today})")]
    FutureStartDate { start: NaiveDate, today: NaiveDate },

    /// No selector/scope combination resolved the role
    #[error("Could not locate the {role} (tried multiple selectors and frames)")]
    ElementNotFound { role: Role },

    #[error("Interaction with the {role} failed: {message}")]
    Interaction { role: Role, message: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScraperError {
    pub(crate) fn interaction(role: Role, err: impl std::fmt::Display) -> Self {
        ScraperError::Interaction {
            role,
            message: err.to_string(),
        }
    }

    /// Configuration errors abort the run before a browser is launched.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ScraperError::InvalidStartDate(_)
                | ScraperError::FutureStartDate { .. }
                | ScraperError::Config(_)
        )
    }
}

impl From<BrowserError> for ScraperError {
    fn from(err: BrowserError) -> Self {
        ScraperError::Browser(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScraperError {
    fn from(err: serde_yaml::Error) -> Self {
        ScraperError::Config(err.to_string())
    }
}

pub type ScraperResult<T> = Result<T, ScraperError>;
