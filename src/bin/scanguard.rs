// src/bin/scanguard.rs

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ColorChoice, CommandFactory, FromArgMatches};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;

use scanguard::cli::{Cli, ColorMode, Commands};
use scanguard::commands::decode::{DecodeArgs, decode_file};
use scanguard::commands::inspect::inspect_files;
use scanguard::commands::version::print_version;
use scanguard::{BoundaryConfig, install_segfault_handler};

/// A timer that outputs nothing but still enables span timing calculation
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(
        &self,
        _w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        Ok(())
    }
}

fn main() -> ExitCode {
    install_segfault_handler();
    init_tracing();

    let styles = Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default());

    let matches = Cli::command()
        .styles(styles)
        .color(color_choice_from_args())
        .get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let config = match BoundaryConfig::from_env()
        .and_then(|config| config.with_overrides(cli.strategy, cli.fiber_stack))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let boundary = config.boundary();
    tracing::debug!(strategy = %boundary.strategy(), "boundary configured");

    match cli.command {
        Commands::Decode {
            file,
            output,
            format,
            lenient,
        } => decode_file(
            &file,
            DecodeArgs {
                output: output.as_deref(),
                format,
                lenient,
                color: cli.color,
            },
            boundary,
        ),
        Commands::Inspect { paths } => inspect_files(&paths, boundary, cli.color),
        Commands::Version => print_version(),
    }
}

/// Initialize tracing if SCANGUARD_LOG is set.
/// SCANGUARD_LOG_STYLE: "compact" (default) or "full" (with timestamps).
fn init_tracing() {
    let Ok(filter) = EnvFilter::try_from_env("SCANGUARD_LOG") else {
        return;
    };
    let style = std::env::var("SCANGUARD_LOG_STYLE").unwrap_or_default();
    if style == "full" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(NoTimestamp)
            .with_writer(std::io::stderr)
            .init();
    }
    tracing::debug!("tracing initialized");
}

/// Pre-scan args so clap's own help and errors respect `--color`.
fn color_choice_from_args() -> ColorChoice {
    let args: Vec<String> = std::env::args().collect();
    let mut requested = None;
    for (i, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix("--color=") {
            requested = Some(value.to_string());
        } else if arg == "--color" {
            requested = args.get(i + 1).cloned();
        }
    }

    let mode = requested
        .and_then(|value| <ColorMode as clap::ValueEnum>::from_str(&value, true).ok())
        .unwrap_or_default();
    match mode {
        ColorMode::Auto => ColorChoice::Auto,
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
    }
}
