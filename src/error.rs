use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid window for examiner {examiner_id}: no tasks to score")]
    InvalidWindow { examiner_id: String },
}

/// Why a raw record was excluded before scoring.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("missing examiner id")]
    MissingExaminer,

    #[error("missing protocol id")]
    MissingProtocol,

    #[error("missing start time")]
    MissingStart,

    #[error("end time before start time")]
    EndBeforeStart,
}
