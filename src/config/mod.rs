//! Configuration module for resq.
//!
//! Handles the config file, environment variables, and settings.

mod settings;

pub use settings::{
    expand_env_vars, DatabaseSettings, LoggingSettings, PaginationSettings, Settings,
    SettingsError,
};
