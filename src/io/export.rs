//! JSON exports.
//!
//! Every file wraps its payload in an [`Export`] envelope recording which tool
//! wrote it and when, so results from different runs can be told apart.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ScanResult, XiTable};
use crate::error::AppError;

/// File envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export<T> {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> Export<T> {
    pub fn new(payload: T) -> Self {
        Self {
            tool: "bao".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            payload,
        }
    }
}

/// Write an α scan to a JSON file.
pub fn write_scan_json(path: &Path, scan: &ScanResult) -> Result<(), AppError> {
    write_json(path, &Export::new(scan))
}

/// Write a ξ table to a JSON file.
pub fn write_xi_json(path: &Path, table: &XiTable) -> Result<(), AppError> {
    write_json(path, &Export::new(table))
}

/// Read back an α scan written by [`write_scan_json`].
pub fn read_scan_json(path: &Path) -> Result<Export<ScanResult>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::new(3, format!("Failed to parse scan JSON '{}': {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    info!(path = %path.display(), "wrote export");
    Ok(())
}
