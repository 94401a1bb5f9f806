mod config;
mod error;
pub mod helpers;
mod types;

pub use config::*;
pub use error::RiposteError;
pub use types::*;
