//! Tool configuration.

mod config;

pub use self::config::{Config, DEFAULT_CONFIG_YAML};
