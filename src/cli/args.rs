// src/cli/args.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use scanguard_engine::ColorSpace;

use crate::commands::version::version_string;
use crate::config::StrategyKind;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Pixel layout written by `decode`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Gray,
    Rgb,
    Rgba,
    Bgra,
    Argb,
    Abgr,
    Rgbx,
    Bgrx,
    Xrgb,
    Xbgr,
}

impl From<OutputFormat> for ColorSpace {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Gray => ColorSpace::Grayscale,
            OutputFormat::Rgb => ColorSpace::Rgb,
            OutputFormat::Rgba => ColorSpace::Rgba,
            OutputFormat::Bgra => ColorSpace::Bgra,
            OutputFormat::Argb => ColorSpace::Argb,
            OutputFormat::Abgr => ColorSpace::Abgr,
            OutputFormat::Rgbx => ColorSpace::Rgbx,
            OutputFormat::Bgrx => ColorSpace::Bgrx,
            OutputFormat::Xrgb => ColorSpace::Xrgb,
            OutputFormat::Xbgr => ColorSpace::Xbgr,
        }
    }
}

/// Decode QOI images through a recoverable engine boundary
#[derive(Parser)]
#[command(name = "scanguard")]
#[command(version = version_string())]
#[command(about = "Decode QOI images without letting engine errors abort the process", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// How engine errors are recovered (default: $SCANGUARD_STRATEGY or unwind)
    #[arg(long, global = true, value_enum)]
    pub strategy: Option<StrategyKind>,

    /// Fiber stack size, e.g. 256k (default: $SCANGUARD_FIBER_STACK or 1M)
    #[arg(long, global = true, value_name = "SIZE", value_parser = parse_stack_size)]
    pub fiber_stack: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_stack_size(value: &str) -> Result<usize, String> {
    crate::config::parse_size(value).ok_or_else(|| format!("invalid size '{value}'"))
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode an image to raw pixels
    #[command(visible_alias = "d")]
    Decode {
        /// Path to the .qoi file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the raw pixel rows to this file
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Output pixel layout (default: rgba or the stream's own layout)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Keep the rows decoded before a scanline error
        #[arg(long)]
        lenient: bool,
    },
    /// Show header information for images
    #[command(visible_alias = "i")]
    Inspect {
        /// Paths to inspect (files, directories, or glob patterns)
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<String>,
    },
    /// Show version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_decode_with_globals() {
        let cli = Cli::try_parse_from([
            "scanguard",
            "decode",
            "img.qoi",
            "--format",
            "bgra",
            "--strategy",
            "fiber",
            "--fiber-stack",
            "128k",
            "--lenient",
        ])
        .unwrap();
        assert_eq!(cli.strategy, Some(StrategyKind::Fiber));
        assert_eq!(cli.fiber_stack, Some(128 * 1024));
        match cli.command {
            Commands::Decode {
                file,
                output,
                format,
                lenient,
            } => {
                assert_eq!(file, PathBuf::from("img.qoi"));
                assert_eq!(output, None);
                assert_eq!(format.map(ColorSpace::from), Some(ColorSpace::Bgra));
                assert!(lenient);
            }
            _ => panic!("expected decode"),
        }
    }

    #[test]
    fn inspect_requires_paths() {
        assert!(Cli::try_parse_from(["scanguard", "inspect"]).is_err());
    }
}
