use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("classification result is missing `{0}`")]
    MissingField(&'static str),

    #[error("recording score {0} would overflow the statistics counters")]
    ScoreOverflow(i64),

    #[error("nothing to export: the audit chain is empty")]
    NothingToExport,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
