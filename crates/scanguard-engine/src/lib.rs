//! Streaming QOI decompression engine with a libjpeg-style session API.
//!
//! A [`Decompress`] session is driven through `set_source`, `read_header`,
//! `start_decompress`, `read_scanlines` and `finish_decompress`. None of
//! these return errors. Unrecoverable conditions are reported by calling the
//! bound [`ErrorMgr`]'s `error_exit`, which must not return: the standard
//! table terminates the process. Callers that want a recoverable failure
//! substitute their own `error_exit` around the call.
//!
//! ```no_run
//! use scanguard_engine::{Decompress, ErrorMgr};
//!
//! let data = std::fs::read("image.qoi").unwrap();
//! let mut err = ErrorMgr::std();
//! let mut session = Decompress::new(&mut err);
//! session.set_source(&data);
//! session.read_header(true);
//! session.start_decompress();
//! let mut row = vec![0; session.row_stride()];
//! while session.output_scanline < session.output_height {
//!     session.read_scanlines(&mut row, 1);
//! }
//! session.finish_decompress();
//! ```
mod color;
pub mod error;
pub mod qoi;
mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use color::ColorSpace;
pub use error::{EmitMessageFn, ErrorExitFn, ErrorMgr, Message, OutputMessageFn, ResetFn};
pub use session::{Decompress, FaultPoint, FileColorSpace, GlobalState, HeaderStatus};
