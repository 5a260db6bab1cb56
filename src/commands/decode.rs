// src/commands/decode.rs

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use super::common::{TermColors, read_image, report_error};
use crate::boundary::Boundary;
use crate::cli::{ColorMode, OutputFormat};
use crate::crash::{self, ContextGuard};
use crate::decoder::{DecodeOptions, DecodedImage, Decoder};
use crate::errors::DecodeError;

pub struct DecodeArgs<'a> {
    pub output: Option<&'a Path>,
    pub format: Option<OutputFormat>,
    pub lenient: bool,
    pub color: ColorMode,
}

/// Decode one image, optionally writing its raw rows to a file.
pub fn decode_file(path: &Path, args: DecodeArgs<'_>, boundary: Boundary) -> ExitCode {
    let ctx = crash::enter(&format!("reading {}", path.display()));
    let options = DecodeOptions {
        format: args.format.map(Into::into),
        lenient: args.lenient,
    };

    match decode_to(path, args.output, Decoder::new(boundary, options), &ctx) {
        Ok(image) => {
            print_summary(path, &image, args.output, &TermColors::with_mode(args.color));
            if image.is_complete() {
                ExitCode::SUCCESS
            } else {
                // Lenient decodes still report the damage.
                ExitCode::from(2)
            }
        }
        Err(err) => {
            report_error(path, &err, args.color);
            ExitCode::FAILURE
        }
    }
}

fn decode_to(
    path: &Path,
    output: Option<&Path>,
    decoder: Decoder,
    ctx: &ContextGuard,
) -> Result<DecodedImage, DecodeError> {
    let data = read_image(path)?;
    ctx.update(&format!("decoding {}", path.display()));
    let image = decoder.decode(&data)?;
    if let Some(out) = output {
        ctx.update(&format!("writing {}", out.display()));
        fs::write(out, &image.pixels).map_err(|source| DecodeError::Io {
            path: out.display().to_string(),
            source,
        })?;
    }
    Ok(image)
}

fn print_summary(path: &Path, image: &DecodedImage, output: Option<&Path>, colors: &TermColors) {
    let (status_color, status) = if image.is_complete() {
        (colors.green(), "ok")
    } else {
        (colors.yellow(), "partial")
    };
    println!(
        "{}{}{} {}: {}x{} {}, {}/{} rows{}",
        status_color,
        status,
        colors.reset(),
        path.display(),
        image.width,
        image.height,
        image.format,
        image.rows_decoded,
        image.height,
        warnings_suffix(image.warnings),
    );
    if let Some(out) = output {
        println!(
            "{}  wrote {} bytes ({} per row) to {}{}",
            colors.dim(),
            image.pixels.len(),
            image.bytes_per_row,
            out.display(),
            colors.reset()
        );
    }
}

fn warnings_suffix(warnings: u32) -> String {
    match warnings {
        0 => String::new(),
        1 => ", 1 warning".to_string(),
        n => format!(", {n} warnings"),
    }
}
