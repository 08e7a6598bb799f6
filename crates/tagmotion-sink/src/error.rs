use thiserror::Error;

/// Failure of an external collaborator. The affected frame is dropped; the
/// stream carries on.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Identity lookup failure: {0}")]
    Identity(String),
    #[error("Publish failure: {0}")]
    Publish(String),
    #[error("Serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid time range {start}..={end}")]
    InvalidRange { start: i64, end: i64 },
    #[error("No data in range")]
    NoData,
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}
