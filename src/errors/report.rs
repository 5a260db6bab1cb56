// src/errors/report.rs
//! Rendering utilities for miette diagnostics.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, ThemeCharacters, ThemeStyles};
use std::io::IsTerminal;

use crate::cli::ColorMode;

/// Create a handler for terminal output (unicode + colors).
fn terminal_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::unicode(),
        styles: ThemeStyles::ansi(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Create a handler for plain output (ascii + no colors).
fn plain_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::ascii(),
        styles: ThemeStyles::none(),
    };
    GraphicalReportHandler::new_themed(theme)
}

fn handler_for(mode: ColorMode) -> GraphicalReportHandler {
    let color = match mode {
        ColorMode::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        }
        ColorMode::Always => true,
        ColorMode::Never => false,
    };
    if color {
        terminal_handler()
    } else {
        plain_handler()
    }
}

fn render(handler: &GraphicalReportHandler, report: &dyn Diagnostic) -> Option<String> {
    let mut output = String::new();
    handler.render_report(&mut output, report).ok()?;
    Some(output)
}

/// Render to stderr, with colors as `mode` asks.
pub fn render_to_stderr(report: &dyn Diagnostic, mode: ColorMode) {
    if let Some(output) = render(&handler_for(mode), report) {
        eprint!("{}", output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecodeError;

    #[test]
    fn render_scanline_error_to_string() {
        let err = DecodeError::Scanline {
            row: 12,
            message: "premature end of data at scanline 12".to_string(),
        };

        let output = render(&plain_handler(), &err).unwrap();
        assert!(output.contains("S0004"), "should contain error code");
        assert!(
            output.contains("failed to decode scanline 12"),
            "should contain message"
        );
        assert!(output.contains("--lenient"), "should contain help text");
    }

    #[test]
    fn render_io_error_with_source() {
        let err = DecodeError::Io {
            path: "missing.qoi".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };

        let output = render(&plain_handler(), &err).unwrap();
        assert!(output.contains("S0006"));
        assert!(output.contains("missing.qoi"));
        assert!(output.contains("no such file"));
    }
}
