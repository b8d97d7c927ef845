//! Utility functions for log formatting and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for logging response bodies and article text
//! - Output path validation before a run starts

use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes, cut on a character
/// boundary, with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure the parent directory of `path` exists and is writable.
///
/// Creates missing directories, then checks writability with a throwaway
/// file so a bad output path fails before any request is made.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ensure_parent_writable(path: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let check_path = dir.join("..__write_check__");
    fs::File::create(&check_path)?;
    let _ = fs::remove_file(&check_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}
