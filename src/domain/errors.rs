use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// A write or lookup targeted a header or line key that does not exist.
    #[error("Order or line not found")]
    NotFound,

    /// A write affected an unexpected number of rows (integrity concern).
    /// Never retried here; the caller may retry the whole logical operation.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Every order id in the allocation range is in use for this user, so
    /// minting cannot terminate.
    #[error("No free order id left in the allocation range")]
    IdSpaceExhausted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
