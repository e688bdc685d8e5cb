//! Configuration Module
//!
//! Environment-driven configuration for the rate board.

mod settings;

pub use settings::{
    BoardConfig, ConfigError, GeneratorSettings, MonitorSettings, PulseSettings, ShutdownSettings,
    UiSettings,
};
