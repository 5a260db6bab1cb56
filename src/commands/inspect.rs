// src/commands/inspect.rs

use std::path::Path;
use std::process::ExitCode;

use scanguard_engine::FileColorSpace;

use super::common::{TermColors, read_image, report_error};
use crate::boundary::Boundary;
use crate::cli::{ColorMode, expand_paths};
use crate::crash;
use crate::decoder::{DecodeOptions, Decoder, ImageInfo};
use crate::errors::DecodeError;

/// Print header information for every image matched by `patterns`.
pub fn inspect_files(patterns: &[String], boundary: Boundary, color_mode: ColorMode) -> ExitCode {
    let files = match expand_paths(patterns) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if files.is_empty() {
        eprintln!("error: no .qoi files found");
        return ExitCode::FAILURE;
    }

    let decoder = Decoder::new(boundary, DecodeOptions::default());
    let colors = TermColors::with_mode(color_mode);
    let mut failed = 0usize;

    for path in &files {
        match inspect_single_file(path, &decoder) {
            Ok(info) => println!("{}", describe(path, &info, &colors)),
            Err(err) => {
                failed += 1;
                report_error(path, &err, color_mode);
            }
        }
    }

    if files.len() > 1 {
        println!("\n{}", summary(files.len(), failed, &colors));
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn inspect_single_file(path: &Path, decoder: &Decoder) -> Result<ImageInfo, DecodeError> {
    let _ctx = crash::enter(&format!("inspecting {}", path.display()));
    let data = read_image(path)?;
    decoder.read_info(&data)
}

fn describe(path: &Path, info: &ImageInfo, colors: &TermColors) -> String {
    let transfer = match info.color_space {
        FileColorSpace::Srgb => "srgb",
        FileColorSpace::Linear => "linear",
    };
    let layout = if info.channels == 4 { "rgba" } else { "rgb" };
    let empty = if info.has_image { "" } else { " (empty)" };
    format!(
        "{}{}{}: {}x{} {} {}{}",
        colors.green(),
        path.display(),
        colors.reset(),
        info.width,
        info.height,
        layout,
        transfer,
        empty
    )
}

fn summary(inspected: usize, failed: usize, colors: &TermColors) -> String {
    let failed_color = if failed > 0 { colors.red() } else { colors.dim() };
    format!(
        "{}{} inspected, {}{}{} failed{}",
        colors.dim(),
        inspected,
        colors.reset(),
        failed_color,
        failed,
        colors.reset()
    )
}
