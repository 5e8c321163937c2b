//! File I/O helpers for structured evaluation artifacts.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Creates a directory recursively when needed.
pub fn ensure_directory(directory_path: &Path) -> Result<()> {
    fs::create_dir_all(directory_path)
        .with_context(|| format!("Failed to create directory: {}", directory_path.display()))
}

/// Writes a pretty-printed JSON payload, creating parent directories.
pub fn write_json_file<T: Serialize>(file_path: &Path, payload: &T) -> Result<()> {
    if let Some(parent_directory) = file_path.parent() {
        ensure_directory(parent_directory)?;
    }
    let json_text = serde_json::to_string_pretty(payload)
        .with_context(|| format!("Failed to serialize JSON for: {}", file_path.display()))?;
    fs::write(file_path, json_text)
        .with_context(|| format!("Failed to write JSON file: {}", file_path.display()))
}

/// Reads and decodes a JSON file.
pub fn read_json_file<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let json_text = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read JSON file: {}", file_path.display()))?;
    serde_json::from_str(&json_text)
        .with_context(|| format!("Failed to parse JSON file: {}", file_path.display()))
}

/// ISO-like filesystem-safe UTC timestamp suffix.
pub fn timestamp_suffix() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}
