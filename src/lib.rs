pub mod config;
pub mod context;
mod error;
mod provider;

pub use config::{Config, ConfigError, Dynamic};
pub use context::AppContext;
pub use error::Error;
pub use provider::new;
