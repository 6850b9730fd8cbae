pub mod config_error;
pub mod relay_error;

pub use config_error::ConfigError;
pub use relay_error::{RelayError, RelayResult};
