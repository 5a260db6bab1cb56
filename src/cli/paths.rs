// src/cli/paths.rs
//
// Expansion of command line path arguments into image files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::glob;
use thiserror::Error;

/// Extension of the files picked up from directories and globs.
pub const IMAGE_EXTENSION: &str = "qoi";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("error reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Expand path arguments into `.qoi` files.
///
/// Each pattern can be a file, a directory (searched recursively), or a glob.
/// Explicitly named files are kept in argument order even without the
/// extension, since the decoder checks the magic anyway. Files found through
/// directories and globs are filtered by extension, sorted, and follow the
/// explicit ones. Duplicates are dropped.
pub fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>, PathError> {
    let mut explicit = Vec::new();
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let path = PathBuf::from(pattern);
        if path.is_file() {
            add_unique(path, &mut explicit, &mut seen);
        } else if path.is_dir() {
            let pattern = format!("{}/**/*", pattern.trim_end_matches('/'));
            expand_glob(&pattern, &mut found)?;
        } else {
            expand_glob(pattern, &mut found)?;
        }
    }

    found.sort();
    for path in found {
        add_unique(path, &mut explicit, &mut seen);
    }
    Ok(explicit)
}

fn expand_glob(pattern: &str, files: &mut Vec<PathBuf>) -> Result<(), PathError> {
    let entries = glob(pattern).map_err(|e| PathError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;

    for entry in entries {
        let path = entry.map_err(|e| PathError::Io {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Dedup on the canonical path.
fn add_unique(path: PathBuf, files: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>) {
    let key = path.canonicalize().unwrap_or_else(|_| path.clone());
    if seen.insert(key) {
        files.push(path);
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(IMAGE_EXTENSION))
}
