use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

// Base data directory
pub const DATA_DIR: &str = "data";

// Harvest output lands here unless --output says otherwise
pub const FILINGS_SUBDIR: &str = "filings";

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create directory {:?}", path))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}
