//! Request parsing
//!
//! A single request is one JSON transaction object. A batch is either a
//! JSON array of transactions or one transaction object per line.

use crate::error::CliError;
use sentinel_core::TransactionRecord;
use std::io::Read;
use std::path::Path;

/// Read a request body from `path`, or from stdin when no path is given
/// or the path is `-`
pub fn read_body(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(p) if p != Path::new("-") => Ok(std::fs::read_to_string(p)?),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

pub fn parse_single(text: &str) -> Result<TransactionRecord, CliError> {
    serde_json::from_str(text.trim()).map_err(|e| CliError::Input(e.to_string()))
}

pub fn parse_batch(text: &str) -> Result<Vec<TransactionRecord>, CliError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| CliError::Input(e.to_string()));
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|e| CliError::Input(format!("line {}: {}", idx + 1, e)))
        })
        .collect()
}
