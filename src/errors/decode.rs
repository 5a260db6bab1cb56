// src/errors/decode.rs
//! Decoding errors (S0xxx).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DecodeError {
    #[error("input is not a QOI image")]
    #[diagnostic(
        code(S0001),
        help("QOI streams start with the four bytes \"qoif\"")
    )]
    NotQoi,

    #[error("failed to read image header: {message}")]
    #[diagnostic(code(S0002))]
    Header { message: String },

    #[error("failed to start decompression: {message}")]
    #[diagnostic(code(S0003))]
    Start { message: String },

    #[error("failed to decode scanline {row}: {message}")]
    #[diagnostic(
        code(S0004),
        help("pass --lenient to keep the rows decoded before the error")
    )]
    Scanline { row: u32, message: String },

    #[error("failed to finish decompression: {message}")]
    #[diagnostic(code(S0005))]
    Finish { message: String },

    #[error("cannot access '{path}'")]
    #[diagnostic(code(S0006))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// Scanline the failure happened on, if it happened while scanning.
    pub fn row(&self) -> Option<u32> {
        match self {
            DecodeError::Scanline { row, .. } => Some(*row),
            _ => None,
        }
    }
}
