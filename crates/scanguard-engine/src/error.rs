// crates/scanguard-engine/src/error.rs
//
// Error manager: the pluggable reporting interface a session calls into.
// Modelled on libjpeg's `jpeg_error_mgr`: a table of entry points plus the
// diagnostic state of the most recent message.

use thiserror::Error;

use crate::session::{Decompress, GlobalState};

/// Fatal error entry point. Must never return control to the engine.
pub type ErrorExitFn = fn(&mut Decompress<'_>);
/// Warning (`level < 0`) and trace (`level > 0`) entry point.
pub type EmitMessageFn = fn(&mut Decompress<'_>, i32);
/// Writes the formatted current message somewhere useful.
pub type OutputMessageFn = fn(&mut Decompress<'_>);
/// Clears per-image diagnostic state.
pub type ResetFn = fn(&mut Decompress<'_>);

/// Messages the engine raises through its error manager.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    #[error("no data source was supplied")]
    NoSource,

    #[error("empty input stream")]
    EmptyInput,

    #[error("not a QOI stream (starts with {found:02x?})")]
    BadMagic { found: [u8; 4] },

    #[error("premature end of header ({available} of 14 bytes)")]
    TruncatedHeader { available: usize },

    #[error("unsupported channel count {0}")]
    BadChannels(u8),

    #[error("unsupported colorspace tag {0}")]
    BadColorSpace(u8),

    #[error("image of {width}x{height} exceeds the pixel limit")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("stream contains no image")]
    NoImage,

    #[error("improper call in engine state {0}")]
    BadState(GlobalState),

    #[error("output buffer of {len} bytes cannot hold a {stride}-byte row")]
    BufferTooSmall { len: usize, stride: usize },

    #[error("premature end of data at scanline {row}")]
    TruncatedData { row: u32 },

    #[error("application transferred too few scanlines ({read} of {height})")]
    TooLittleData { read: u32, height: u32 },

    #[error("injected fault")]
    InjectedFault,

    #[error("end marker missing")]
    MissingEndMarker,

    #[error("{0} extraneous bytes after end marker")]
    ExtraneousData(usize),

    #[error("application asked for more scanlines than the image has")]
    TooMuchData,
}

impl Message {
    /// Warnings are emitted through `emit_message`; everything else goes
    /// through `error_exit`.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Message::MissingEndMarker | Message::ExtraneousData(_) | Message::TooMuchData
        )
    }
}

/// The error reporting interface bound to a [`Decompress`] session.
///
/// The table is `Copy` so a caller can take a snapshot of it, override some
/// entry points, and bind the copy in place of the original.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMgr {
    pub error_exit: ErrorExitFn,
    pub emit_message: EmitMessageFn,
    pub output_message: OutputMessageFn,
    pub reset_error_mgr: ResetFn,
    /// Most recent message raised by the engine.
    pub msg_code: Option<Message>,
    /// Trace messages at or below this level are output.
    pub trace_level: i32,
    /// Number of warnings seen for the current image.
    pub num_warnings: u32,
}

impl ErrorMgr {
    /// Standard handlers: fatal errors print the message and terminate the
    /// process with a failure status.
    pub fn std() -> Self {
        ErrorMgr {
            error_exit: std_error_exit,
            emit_message: std_emit_message,
            output_message: std_output_message,
            reset_error_mgr: std_reset_error_mgr,
            msg_code: None,
            trace_level: 0,
            num_warnings: 0,
        }
    }

    /// Standard handlers, except that `error_exit` only outputs the message
    /// and then returns.
    ///
    /// A returning `error_exit` breaks the engine's contract, so this table is
    /// only useful behind something that diverts control after the handler
    /// runs (see the `scanguard` boundary). Used bare, the engine aborts.
    pub fn diagnostic() -> Self {
        ErrorMgr {
            error_exit: diagnostic_error_exit,
            ..ErrorMgr::std()
        }
    }

    /// Format the current message.
    pub fn format_message(&self) -> String {
        match &self.msg_code {
            Some(msg) => msg.to_string(),
            None => "no error message recorded".to_string(),
        }
    }
}

impl Default for ErrorMgr {
    fn default() -> Self {
        ErrorMgr::std()
    }
}

fn std_error_exit(session: &mut Decompress<'_>) {
    let output = session.reporter().output_message;
    output(session);
    session.abort();
    std::process::exit(1);
}

fn diagnostic_error_exit(session: &mut Decompress<'_>) {
    let output = session.reporter().output_message;
    output(session);
}

fn std_emit_message(session: &mut Decompress<'_>, level: i32) {
    let err = *session.reporter();
    if level < 0 {
        // Only the first warning is shown unless tracing is turned up.
        if err.num_warnings == 0 || err.trace_level >= 3 {
            (err.output_message)(session);
        }
        session.reporter_mut().num_warnings += 1;
    } else if err.trace_level >= level {
        (err.output_message)(session);
    }
}

fn std_output_message(session: &mut Decompress<'_>) {
    let text = session.reporter().format_message();
    eprintln!("scanguard-engine: {}", text);
}

fn std_reset_error_mgr(session: &mut Decompress<'_>) {
    let err = session.reporter_mut();
    err.msg_code = None;
    err.num_warnings = 0;
}
