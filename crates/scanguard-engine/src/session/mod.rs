// crates/scanguard-engine/src/session.rs
//
// Decompression session. Every operation that can fail reports through the
// bound error manager's `error_exit`, which is expected to divert control;
// none of them return an error value.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::color::ColorSpace;
use crate::error::{ErrorMgr, Message};
use crate::qoi::{ChunkStream, END_MARKER, Header};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalState {
    /// Created or finished; accepts a new source and `read_header`.
    Start,
    /// Header parsed; output parameters may be adjusted.
    Ready,
    /// `start_decompress` done; scanlines may be read.
    Scanning,
}

impl fmt::Display for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalState::Start => f.write_str("start"),
            GlobalState::Ready => f.write_str("ready"),
            GlobalState::Scanning => f.write_str("scanning"),
        }
    }
}

/// Result of a `read_header` that did not raise a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// An image follows; the session is ready to start decompression.
    Image,
    /// The header describes a zero-area image and `require_image` was false.
    NoImage,
}

/// Transfer function tag from the stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileColorSpace {
    /// sRGB color channels with linear alpha.
    Srgb,
    /// All channels linear.
    Linear,
}

/// Engine step at which an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    Header,
    Start,
    /// Before decoding the given scanline.
    Scanline(u32),
}

/// A decompression session.
///
/// The session borrows its error manager and its input for `'r`. The
/// error-reporting binding can be swapped for the duration of a call with
/// [`Decompress::replace_error_binding`].
pub struct Decompress<'r> {
    err: NonNull<ErrorMgr>,
    src: Option<&'r [u8]>,
    global_state: GlobalState,
    chunks: Option<ChunkStream>,
    fault: Option<FaultPoint>,

    pub image_width: u32,
    pub image_height: u32,
    pub channels: u8,
    pub file_color_space: FileColorSpace,

    /// Layout produced by `read_scanlines`. Adjustable while `Ready`.
    pub out_color_space: ColorSpace,
    pub output_width: u32,
    pub output_height: u32,
    pub output_components: usize,
    pub output_scanline: u32,

    _reporter: PhantomData<&'r mut ErrorMgr>,
}

impl<'r> Decompress<'r> {
    /// Create a session bound to `err`, resetting its diagnostic state.
    pub fn new(err: &'r mut ErrorMgr) -> Self {
        let mut session = Decompress {
            err: NonNull::from(err),
            src: None,
            global_state: GlobalState::Start,
            chunks: None,
            fault: None,
            image_width: 0,
            image_height: 0,
            channels: 0,
            file_color_space: FileColorSpace::Srgb,
            out_color_space: ColorSpace::Rgba,
            output_width: 0,
            output_height: 0,
            output_components: 0,
            output_scanline: 0,
            _reporter: PhantomData,
        };
        let reset = session.reporter().reset_error_mgr;
        reset(&mut session);
        session
    }

    /// The currently bound error manager.
    pub fn error_binding(&self) -> NonNull<ErrorMgr> {
        self.err
    }

    /// Bind a different error manager, returning the previous binding.
    ///
    /// # Safety
    /// `binding` must point to a valid `ErrorMgr` (or a `#[repr(C)]` struct
    /// whose first field is one) for as long as it stays bound, and the
    /// original binding must be restored before that memory goes away.
    pub unsafe fn replace_error_binding(&mut self, binding: NonNull<ErrorMgr>) -> NonNull<ErrorMgr> {
        std::mem::replace(&mut self.err, binding)
    }

    pub fn reporter(&self) -> &ErrorMgr {
        // Safety: the binding is valid for the session's lifetime, or for the
        // extent of the call that replaced it.
        unsafe { self.err.as_ref() }
    }

    pub fn reporter_mut(&mut self) -> &mut ErrorMgr {
        unsafe { self.err.as_mut() }
    }

    pub fn global_state(&self) -> GlobalState {
        self.global_state
    }

    /// Bytes in one output row.
    pub fn row_stride(&self) -> usize {
        self.output_width as usize * self.output_components
    }

    /// Arm a one-shot fault that raises [`Message::InjectedFault`] when the
    /// engine reaches `at`.
    pub fn inject_fault(&mut self, at: FaultPoint) {
        self.fault = Some(at);
    }

    /// Supply the compressed input.
    pub fn set_source(&mut self, data: &'r [u8]) {
        if self.global_state != GlobalState::Start {
            self.fatal(Message::BadState(self.global_state));
        }
        self.src = Some(data);
    }

    /// Parse the stream header.
    pub fn read_header(&mut self, require_image: bool) -> HeaderStatus {
        if self.global_state != GlobalState::Start {
            self.fatal(Message::BadState(self.global_state));
        }
        self.check_fault(FaultPoint::Header);
        let Some(data) = self.src else {
            self.fatal(Message::NoSource);
        };
        let header = match Header::parse(data) {
            Ok(header) => header,
            Err(msg) => self.fatal(msg),
        };
        self.image_width = header.width;
        self.image_height = header.height;
        self.channels = header.channels;
        self.file_color_space = if header.colorspace == 0 {
            FileColorSpace::Srgb
        } else {
            FileColorSpace::Linear
        };
        if header.is_empty() {
            if require_image {
                self.fatal(Message::NoImage);
            }
            return HeaderStatus::NoImage;
        }

        self.out_color_space = if header.channels == 3 {
            ColorSpace::Rgb
        } else {
            ColorSpace::Rgba
        };
        self.output_components = self.out_color_space.components();
        self.chunks = Some(ChunkStream::new(data));
        self.global_state = GlobalState::Ready;

        tracing::trace!(
            width = header.width,
            height = header.height,
            channels = header.channels,
            "header parsed"
        );
        HeaderStatus::Image
    }

    /// Fix the output parameters and enter the scanning state.
    pub fn start_decompress(&mut self) {
        if self.global_state != GlobalState::Ready {
            self.fatal(Message::BadState(self.global_state));
        }
        self.check_fault(FaultPoint::Start);
        self.output_width = self.image_width;
        self.output_height = self.image_height;
        self.output_components = self.out_color_space.components();
        self.output_scanline = 0;
        self.global_state = GlobalState::Scanning;
    }

    /// Decode up to `max_lines` rows into `buf`, one row every
    /// [`row_stride`](Self::row_stride) bytes. Returns the rows written.
    pub fn read_scanlines(&mut self, buf: &mut [u8], max_lines: usize) -> usize {
        if self.global_state != GlobalState::Scanning {
            self.fatal(Message::BadState(self.global_state));
        }
        if self.output_scanline >= self.output_height {
            self.warn(Message::TooMuchData);
            return 0;
        }
        let stride = self.row_stride();
        if buf.len() < stride {
            self.fatal(Message::BufferTooSmall {
                len: buf.len(),
                stride,
            });
        }

        let remaining = (self.output_height - self.output_scanline) as usize;
        let rows = max_lines.min(buf.len() / stride).min(remaining);
        for row in buf.chunks_exact_mut(stride).take(rows) {
            self.check_fault(FaultPoint::Scanline(self.output_scanline));
            self.decode_row(row);
            self.output_scanline += 1;
        }
        rows
    }

    /// Verify the stream trailer and return to the start state.
    pub fn finish_decompress(&mut self) {
        if self.global_state != GlobalState::Scanning {
            self.fatal(Message::BadState(self.global_state));
        }
        if self.output_scanline < self.output_height {
            self.fatal(Message::TooLittleData {
                read: self.output_scanline,
                height: self.output_height,
            });
        }

        if let (Some(data), Some(chunks)) = (self.src, self.chunks.as_ref()) {
            let rest = data.get(chunks.position()..).unwrap_or_default();
            if rest.starts_with(&END_MARKER) {
                let extra = rest.len() - END_MARKER.len();
                if extra > 0 {
                    self.warn(Message::ExtraneousData(extra));
                }
            } else {
                self.warn(Message::MissingEndMarker);
            }
        }
        self.abort();
    }

    /// Drop the current image and return to the start state.
    pub fn abort(&mut self) {
        self.src = None;
        self.chunks = None;
        self.output_scanline = 0;
        self.global_state = GlobalState::Start;
    }

    fn decode_row(&mut self, row: &mut [u8]) {
        let Some(data) = self.src else {
            self.fatal(Message::NoSource);
        };
        let space = self.out_color_space;
        let components = self.output_components;
        for out in row.chunks_exact_mut(components) {
            let px = match self.chunks.as_mut().and_then(|c| c.next_pixel(data)) {
                Some(px) => px,
                None => self.fatal(Message::TruncatedData {
                    row: self.output_scanline,
                }),
            };
            space.write_pixel(px, out);
        }
    }

    fn check_fault(&mut self, at: FaultPoint) {
        if self.fault == Some(at) {
            self.fault = None;
            self.fatal(Message::InjectedFault);
        }
    }

    fn warn(&mut self, msg: Message) {
        self.reporter_mut().msg_code = Some(msg);
        let emit = self.reporter().emit_message;
        emit(self, -1);
    }

    /// Raise a fatal error through the bound `error_exit`.
    fn fatal(&mut self, msg: Message) -> ! {
        tracing::trace!(%msg, "raising fatal error");
        self.reporter_mut().msg_code = Some(msg);
        let exit = self.reporter().error_exit;
        exit(self);

        // error_exit must not return: the operation that raised it cannot
        // continue from a half-updated state.
        tracing::error!(%msg, "error_exit returned control to the engine");
        eprintln!(
            "scanguard-engine: error_exit returned after \"{}\"; aborting",
            msg
        );
        std::process::abort();
    }
}

impl fmt::Debug for Decompress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decompress")
            .field("err", &self.err)
            .field("src_len", &self.src.map(<[u8]>::len))
            .field("global_state", &self.global_state)
            .field("image_width", &self.image_width)
            .field("image_height", &self.image_height)
            .field("out_color_space", &self.out_color_space)
            .field("output_scanline", &self.output_scanline)
            .finish_non_exhaustive()
    }
}
