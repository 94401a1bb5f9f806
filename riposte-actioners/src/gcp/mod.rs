//! Thin REST clients for the two Google Cloud APIs the actioners drive.
//! Authentication uses a service-account JWT-bearer exchange when a
//! credentials file is configured, and the instance metadata service
//! otherwise.

mod auth;
mod compute;
mod storage;

pub use auth::TokenProvider;
pub use compute::{FirewallApi, FirewallDenied, FirewallRule, GcpFirewallClient};
pub use storage::{GcsClient, ObjectAttrs, ObjectStoreApi};

#[derive(thiserror::Error, Debug)]
pub enum GcpError {
    #[error("credentials: {0}")]
    Credentials(String),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("compute API: {0}")]
    Compute(String),
    #[error("storage API: {0}")]
    Storage(String),
    #[error("operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },
}
