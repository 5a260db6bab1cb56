// src/decoder.rs
//! Whole-image decoding on top of [`Boundary`].
//!
//! Every engine call goes through the boundary, one scanline at a time, so a
//! corrupt stream becomes a [`DecodeError`] instead of terminating the
//! process. In lenient mode a scanline failure keeps the rows decoded so far.

use scanguard_engine::qoi::MAGIC;
use scanguard_engine::{ColorSpace, Decompress, ErrorMgr, FileColorSpace, HeaderStatus};

use crate::boundary::{Boundary, Outcome};
use crate::errors::DecodeError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Output layout. `None` picks a four-byte layout matching the stream.
    pub format: Option<ColorSpace>,
    /// Return a partial image instead of failing on a scanline error.
    pub lenient: bool,
}

/// Header fields of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub color_space: FileColorSpace,
    /// False for a zero-area image.
    pub has_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: ColorSpace,
    pub bytes_per_row: usize,
    pub color_space: FileColorSpace,
    /// Rows holding decoded data. Less than `height` only for a lenient
    /// decode that hit an error; the rows after it are zeroed.
    pub rows_decoded: u32,
    /// Warnings the engine raised (trailer problems and the like).
    pub warnings: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn is_complete(&self) -> bool {
        self.rows_decoded == self.height
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_row;
        &self.pixels[start..start + self.bytes_per_row]
    }
}

/// Quick magic check, without touching the engine.
pub fn is_qoi(data: &[u8]) -> bool {
    data.starts_with(&MAGIC)
}

/// Four-byte layout used when the caller leaves the format open.
fn preferred_layout(space: ColorSpace) -> ColorSpace {
    match space {
        ColorSpace::Rgb | ColorSpace::Rgbx => ColorSpace::Rgba,
        ColorSpace::Bgrx => ColorSpace::Bgra,
        ColorSpace::Xrgb => ColorSpace::Argb,
        ColorSpace::Xbgr => ColorSpace::Abgr,
        other => other,
    }
}

/// Engine messages go to the log; the caller gets a [`DecodeError`].
fn log_output_message(session: &mut Decompress<'_>) {
    let err = session.reporter();
    match err.msg_code {
        Some(msg) if msg.is_warning() => tracing::warn!(%msg, "engine warning"),
        _ => tracing::debug!(message = %err.format_message(), "engine error"),
    }
}

fn reporter() -> ErrorMgr {
    ErrorMgr {
        output_message: log_output_message,
        ..ErrorMgr::diagnostic()
    }
}

fn last_message(session: &Decompress<'_>) -> String {
    session.reporter().format_message()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    boundary: Boundary,
    options: DecodeOptions,
}

impl Decoder {
    pub fn new(boundary: Boundary, options: DecodeOptions) -> Self {
        Decoder { boundary, options }
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Read the header only.
    pub fn read_info(&self, data: &[u8]) -> Result<ImageInfo, DecodeError> {
        if !is_qoi(data) {
            return Err(DecodeError::NotQoi);
        }
        let mut err = reporter();
        let mut session = Decompress::new(&mut err);
        session.set_source(data);

        let status = match self.boundary.protect(&mut session, |s| s.read_header(false)) {
            Outcome::Success(status) => status,
            Outcome::Failure => {
                return Err(DecodeError::Header {
                    message: last_message(&session),
                });
            }
        };
        let info = ImageInfo {
            width: session.image_width,
            height: session.image_height,
            channels: session.channels,
            color_space: session.file_color_space,
            has_image: status == HeaderStatus::Image,
        };
        session.abort();
        Ok(info)
    }

    /// Decode a complete image.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage, DecodeError> {
        if !is_qoi(data) {
            return Err(DecodeError::NotQoi);
        }
        let mut err = reporter();
        let mut session = Decompress::new(&mut err);
        session.set_source(data);

        if !self.boundary.try_read_header(&mut session, true) {
            return Err(DecodeError::Header {
                message: last_message(&session),
            });
        }
        session.out_color_space = self
            .options
            .format
            .unwrap_or_else(|| preferred_layout(session.out_color_space));

        if !self.boundary.try_start_decompress(&mut session) {
            return Err(DecodeError::Start {
                message: last_message(&session),
            });
        }

        let (width, height) = (session.output_width, session.output_height);
        let bytes_per_row = session.row_stride();
        let mut pixels = vec![0u8; bytes_per_row * height as usize];

        let mut failed_row = None;
        for (y, row) in pixels.chunks_exact_mut(bytes_per_row).enumerate() {
            if !self.boundary.try_read_scanlines(&mut session, row, 1) {
                failed_row = Some(y as u32);
                break;
            }
        }

        let rows_decoded = match failed_row {
            Some(row) => {
                let message = last_message(&session);
                if !self.options.lenient {
                    return Err(DecodeError::Scanline { row, message });
                }
                tracing::warn!(row, %message, "keeping partial image");
                pixels[row as usize * bytes_per_row..].fill(0);
                session.abort();
                row
            }
            None => {
                if !self.boundary.try_finish_decompress(&mut session) {
                    return Err(DecodeError::Finish {
                        message: last_message(&session),
                    });
                }
                height
            }
        };

        let image = DecodedImage {
            width,
            height,
            format: session.out_color_space,
            bytes_per_row,
            color_space: session.file_color_space,
            rows_decoded,
            warnings: session.reporter().num_warnings,
            pixels,
        };
        tracing::debug!(
            width,
            height,
            format = %image.format,
            rows_decoded,
            warnings = image.warnings,
            "decoded image"
        );
        Ok(image)
    }
}
