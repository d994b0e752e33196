//! Daemon configuration.

pub mod settings;

pub use settings::DetectorConfig;
