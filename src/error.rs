use thiserror::Error;

/// Errors an allocation run can fail with.
///
/// Row-level problems (a bad day label, an empty team name) are not errors:
/// the offending row is skipped and reported so the rest of the run can
/// proceed. Only catalog-wide or run-wide problems abort.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The room catalog or allocator configuration is missing or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// A run parameter is invalid (e.g. the week anchor is not a Monday).
    #[error("validation error: {0}")]
    Validation(String),

    /// Writing the new assignments failed; nothing was persisted.
    #[error("persistence error: {0}")]
    Persistence(String),
}
