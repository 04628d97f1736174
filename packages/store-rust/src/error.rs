/// Errors returned by [`RecordRepository`](crate::RecordRepository).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode record: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("record not found: {id}")]
    NotFound { id: String },
    #[error("`{model}` record has not been saved yet")]
    NotSaved { model: String },
    #[error("record {id} belongs to model `{found}`, expected `{expected}`")]
    ModelMismatch {
        id: String,
        expected: String,
        found: String,
    },
}
