pub mod config;
pub mod error;
pub mod types;

pub use config::ChatGraphConfig;
pub use error::{ChatGraphError, Result};
pub use types::*;
