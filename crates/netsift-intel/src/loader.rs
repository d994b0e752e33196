//! Indicator file loading.

use std::path::Path;

use tracing::info;

use crate::engine::ScanEngine;
use crate::error::{IntelError, Result};
use crate::types::IndicatorFile;

/// Read and parse an indicator definition file (JSON).
pub fn load_indicator_file(path: &Path) -> Result<IndicatorFile> {
    let content = std::fs::read_to_string(path).map_err(|source| IntelError::ReadError {
        path: path.display().to_string(),
        source,
    })?;
    let file: IndicatorFile =
        serde_json::from_str(&content).map_err(|source| IntelError::ParseError {
            path: path.display().to_string(),
            source,
        })?;
    Ok(file)
}

/// Load an indicator file and compile a fresh scan engine from it.
pub fn load_engine(path: &Path) -> Result<ScanEngine> {
    let file = load_indicator_file(path)?;
    let count = file.indicators.len();
    let engine = ScanEngine::build(file.indicators);
    info!(
        path = %path.display(),
        count,
        version = %file.version,
        "compiled scan engine from indicator file"
    );
    Ok(engine)
}
