use probe_core::ConfigError;

use crate::verify::VerifyFailure;

/// Errors surfaced while parsing a response.
///
/// Transport failures are not here: they live inside the `Response` so
/// callers can branch, and optionally become synthetic issues.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("response verification failed: {0}")]
    Verification(VerifyFailure),

    /// Malformed JSON when JSON parsing was required; no extraction is
    /// possible, so this propagates hard.
    #[error("stdout is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json path {path:?}: {reason}")]
    Path { path: String, reason: String },

    #[error("unknown binding: {name}")]
    UnknownBinding { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
