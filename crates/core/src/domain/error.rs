// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown format mode: {0} (expected 'auto' or 'manual')")]
    UnknownFormatMode(String),

    #[error("Please select a JSON file: {0}")]
    NotAJsonTask(String),

    #[error("Invalid max concurrency: {0} (must be at least 1)")]
    InvalidConcurrency(usize),
}

pub type Result<T> = std::result::Result<T, DomainError>;
