// src/lib.rs
//! Recoverable calls into the `scanguard-engine` decompression engine.
//!
//! [`boundary`] turns the engine's never-returning fatal error handler into
//! a plain success/failure result. [`decoder`] builds a whole-image decoder
//! on top of it; the remaining modules back the `scanguard` binary.

pub mod boundary;
pub mod cli;
pub mod commands;
pub mod config;
pub mod crash;
pub mod decoder;
pub mod errors;

pub use boundary::{
    Boundary, Outcome, Strategy, try_finish_decompress, try_read_header, try_read_scanlines,
    try_start_decompress,
};
pub use config::BoundaryConfig;
pub use crash::install_segfault_handler;
pub use decoder::{DecodeOptions, DecodedImage, Decoder, ImageInfo};
pub use errors::DecodeError;
