//! Utility modules: logging setup, environment helpers, lock helpers

pub mod env;
pub mod lock;
pub mod logging;

// Re-export commonly used items
pub use env::{env_bool, env_opt, env_or_default};
pub use lock::{with_read_lock, with_write_lock};
pub use logging::{init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
