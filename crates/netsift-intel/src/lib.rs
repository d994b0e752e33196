//! Indicator-of-compromise definitions and the token scan engine.
//!
//! This crate provides:
//! - The token vocabulary shared between extraction and matching
//! - Indicator descriptor and pattern-expression types (JSON file format)
//! - Indicator file loading
//! - The compiled scan engine with its reset / update / hits stream contract

pub mod engine;
pub mod error;
pub mod loader;
pub mod types;

pub use engine::ScanEngine;
pub use error::IntelError;
pub use loader::{load_engine, load_indicator_file};
pub use types::*;
