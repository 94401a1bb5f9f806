use crate::gcp::GcpError;

#[derive(thiserror::Error, Debug)]
pub enum ActionerError {
    #[error("missing required parameter `{0}`")]
    MissingParam(String),
    #[error("parameter `{name}` must be {expected}, got {got}")]
    InvalidParam {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("invalid duration in `{name}`: {error}")]
    InvalidDuration {
        name: String,
        error: humantime::DurationError,
    },
    #[error("failed to render Sigma rule: {0}")]
    Render(#[from] serde_yaml::Error),
    #[error("object {0} was stored with zero size")]
    EmptyObject(String),
    #[error(transparent)]
    Gcp(#[from] GcpError),
}
