use checkin_types::{ResponseError, SchemaError};

/// Error type for questionnaire operations.
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// The phase or one of its manifests could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A response was rejected.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// An operation that needs an active manifest was called before `init`.
    #[error("Questionnaire has not been started; call init first")]
    NotStarted,
}

/// Error type for importing answers.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The input looked like JSON but could not be parsed.
    #[error("Invalid JSON import: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON input is not an answer map or an export document.
    #[error("Expected a JSON object of answers, got {0}")]
    NotAnObject(&'static str),

    /// Nothing recognizable was found in the input.
    #[error("No answers found in import")]
    Empty,
}
