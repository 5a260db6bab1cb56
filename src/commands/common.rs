// src/commands/common.rs
//! Shared utilities for CLI commands.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;

use crate::cli::ColorMode;
use crate::errors::{DecodeError, render_to_stderr};

/// Check if stdout supports color output.
pub fn stdout_supports_color() -> bool {
    // Respect NO_COLOR environment variable (https://no-color.org/)
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    io::stdout().is_terminal()
}

/// ANSI color codes for terminal output.
pub struct TermColors {
    use_color: bool,
}

impl TermColors {
    /// Create a new TermColors with explicit color mode.
    pub fn with_mode(mode: ColorMode) -> Self {
        let use_color = match mode {
            ColorMode::Auto => stdout_supports_color(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        };
        Self { use_color }
    }

    /// Green text (for success).
    pub fn green(&self) -> &'static str {
        if self.use_color { "\x1b[32m" } else { "" }
    }

    /// Red text (for errors/failures).
    pub fn red(&self) -> &'static str {
        if self.use_color { "\x1b[31m" } else { "" }
    }

    /// Yellow text (for partial results).
    pub fn yellow(&self) -> &'static str {
        if self.use_color { "\x1b[33m" } else { "" }
    }

    /// Dim/gray text (for secondary info).
    pub fn dim(&self) -> &'static str {
        if self.use_color { "\x1b[90m" } else { "" }
    }

    /// Reset to default colors.
    pub fn reset(&self) -> &'static str {
        if self.use_color { "\x1b[0m" } else { "" }
    }
}

/// Read a whole input file.
pub fn read_image(path: &Path) -> Result<Vec<u8>, DecodeError> {
    fs::read(path).map_err(|source| DecodeError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Print a decode error for `path` to stderr.
pub fn report_error(path: &Path, err: &DecodeError, color_mode: ColorMode) {
    eprintln!("{}:", path.display());
    render_to_stderr(err, color_mode);
}
