// src/errors/mod.rs
//! User-facing errors, rendered with miette.

pub mod decode;
pub mod report;

pub use decode::DecodeError;
pub use report::render_to_stderr;
