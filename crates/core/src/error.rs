use crate::types::Group;
use thiserror::Error;

pub type GeoLiftResult<T> = Result<T, GeoLiftError>;

#[derive(Error, Debug)]
pub enum GeoLiftError {
    #[error("method must be 'mean', 'median', or 'sum' (got '{0}')")]
    InvalidMethod(String),

    #[error("Insufficient data: {group} group has no observations in the analysis window")]
    InsufficientData { group: Group },

    #[error("Sample size must be at least 1 (got {0})")]
    InvalidSampleSize(usize),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Spend withheld must be a non-negative number (got {0})")]
    InvalidSpend(f64),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for GeoLiftError {
    fn from(err: config::ConfigError) -> Self {
        GeoLiftError::Config(err.to_string())
    }
}
