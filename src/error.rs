use thiserror::Error;

/// Taxonomy of failures across the pipeline: parsing, detection, routing,
/// translation, and batch reprocessing.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A subtitle file could not be read or had no recoverable blocks at all.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// No credentials configured for a provider at all.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The target language has no capable provider among those configured.
    /// The canonical trigger is the Hebrew routing rule excluding a
    /// bulk-MT-only provider.
    #[error("no capable provider for this job: {0}")]
    NoCapableProvider(String),

    /// Timeout, 5xx, or connection reset that survived retries.
    #[error("provider request failed after retries: {0}")]
    ProviderTransient(String),

    /// A batch response didn't return one line per input item, and the
    /// per-item fallback also failed.
    #[error("provider contract violation: {0}")]
    ProviderContractViolation(String),

    /// The classifier's response didn't match the strict line format after
    /// one reprompt.
    #[error("detection format error: {0}")]
    Detection(String),

    /// Reassembly changed segment count, index, or timing. Always fatal.
    #[error("boundary violation: {0}")]
    BoundaryViolation(String),

    #[error("backup failed: {0}")]
    Backup(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl crate::retry::Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        match self {
            PipelineError::ProviderTransient(_) => true,
            PipelineError::Http(e) => !e.status().is_some_and(|s| s.is_client_error()),
            PipelineError::Io(_) => true,
            _ => false,
        }
    }
}
