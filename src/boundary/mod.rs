// src/boundary/mod.rs
//! Recoverable calls into the decompression engine.
//!
//! The engine signals unrecoverable errors by calling its bound
//! `error_exit`, which must never return. A [`Boundary`] runs one engine
//! operation with a shadow reporter bound in place of the session's own:
//!
//! 1. the current binding is saved and a shadow copy of its table is built,
//!    with the original `error_exit` recorded and the shadow's handler
//!    installed in its place;
//! 2. a resumption context is captured and the shadow is bound;
//! 3. the operation runs. If the engine raises a fatal error, the shadow
//!    handler calls the original `error_exit` (so its diagnostics still
//!    surface) and then transfers control back to the boundary, which
//!    reports [`Outcome::Failure`] without re-running the operation;
//! 4. on every exit path, including a foreign panic, the original binding
//!    is restored before the boundary returns.
//!
//! Two ways of leaving the engine are available, see [`Strategy`].
//!
//! # Preconditions
//! - The session must carry a valid binding on entry.
//! - Engine calls for a session must stay inside the operation passed to
//!   the boundary: the resumption context is only valid for the dynamic
//!   extent of that call on the current thread.
//! - Boundaries may nest. A fatal error is absorbed by the innermost
//!   boundary around the failing call.
//!
//! ```
//! use scanguard::boundary::{try_read_header, try_start_decompress};
//! use scanguard_engine::{Decompress, ErrorMgr};
//!
//! let truncated = b"qoif\x00\x00";
//! let mut err = ErrorMgr::diagnostic();
//! let mut session = Decompress::new(&mut err);
//! session.set_source(truncated);
//! assert!(!try_read_header(&mut session, true));
//! assert!(!try_start_decompress(&mut session));
//! ```

mod fiber;
mod guard;
mod shadow;
mod unwind;

use std::fmt;

use scanguard_engine::Decompress;

/// Result of one protected engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T = ()> {
    /// The operation returned normally.
    Success(T),
    /// The engine raised a fatal error during the operation.
    Failure,
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure => Outcome::Failure,
        }
    }
}

impl<T> From<Outcome<T>> for bool {
    fn from(outcome: Outcome<T>) -> bool {
        outcome.is_success()
    }
}

/// How the shadow `error_exit` leaves the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Unwind from the handler to the boundary on the same stack.
    ///
    /// Requires `panic = "unwind"`.
    #[default]
    Unwind,
    /// Run the operation on a dedicated fiber. When the handler fires the
    /// fiber is suspended back to the boundary and then unwound, so values
    /// owned by the operation and guards of nested boundaries still drop.
    ///
    /// Requires `panic = "unwind"` as well.
    Fiber { stack_size: usize },
}

impl Strategy {
    /// Default fiber stack size.
    pub const DEFAULT_FIBER_STACK: usize = 1 << 20;

    pub fn fiber() -> Self {
        Strategy::Fiber {
            stack_size: Self::DEFAULT_FIBER_STACK,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Unwind => f.write_str("unwind"),
            Strategy::Fiber { stack_size } => write!(f, "fiber ({stack_size} byte stack)"),
        }
    }
}

/// Converts the engine's fatal-error protocol into an [`Outcome`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boundary {
    strategy: Strategy,
}

impl Boundary {
    pub fn new(strategy: Strategy) -> Self {
        Boundary { strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Run `op` against `session`, absorbing a fatal engine error.
    ///
    /// Panics raised by `op` itself (or by a reporter entry point) propagate
    /// unchanged, after the session's binding has been restored.
    pub fn protect<'r, R, F>(&self, session: &mut Decompress<'r>, op: F) -> Outcome<R>
    where
        F: FnOnce(&mut Decompress<'r>) -> R,
    {
        let before = session.error_binding();
        let outcome = match self.strategy {
            Strategy::Unwind => unwind::protect(session, op),
            Strategy::Fiber { stack_size } => fiber::protect(session, stack_size, op),
        };
        debug_assert_eq!(session.error_binding(), before);

        if outcome.is_failure() {
            tracing::debug!(
                strategy = %self.strategy,
                message = %session.reporter().format_message(),
                "recovered from fatal engine error"
            );
        }
        outcome
    }

    fn protect_named<'r, R, F>(&self, name: &'static str, session: &mut Decompress<'r>, op: F) -> bool
    where
        F: FnOnce(&mut Decompress<'r>) -> R,
    {
        let ok = self.protect(session, op).is_success();
        tracing::trace!(op = name, ok, state = %session.global_state(), "protected call");
        ok
    }

    /// `read_header`, returning `false` instead of leaving through `error_exit`.
    pub fn try_read_header(&self, session: &mut Decompress<'_>, require_image: bool) -> bool {
        self.protect_named("read_header", session, |s| {
            s.read_header(require_image);
        })
    }

    pub fn try_start_decompress(&self, session: &mut Decompress<'_>) -> bool {
        self.protect_named("start_decompress", session, |s| s.start_decompress())
    }

    /// `read_scanlines`; on success the rows written are reflected in
    /// `session.output_scanline`.
    pub fn try_read_scanlines(
        &self,
        session: &mut Decompress<'_>,
        buf: &mut [u8],
        max_lines: usize,
    ) -> bool {
        self.protect_named("read_scanlines", session, |s| {
            s.read_scanlines(buf, max_lines);
        })
    }

    pub fn try_finish_decompress(&self, session: &mut Decompress<'_>) -> bool {
        self.protect_named("finish_decompress", session, |s| s.finish_decompress())
    }
}

/// [`Boundary::try_read_header`] with the default strategy.
pub fn try_read_header(session: &mut Decompress<'_>, require_image: bool) -> bool {
    Boundary::default().try_read_header(session, require_image)
}

/// [`Boundary::try_start_decompress`] with the default strategy.
pub fn try_start_decompress(session: &mut Decompress<'_>) -> bool {
    Boundary::default().try_start_decompress(session)
}

/// [`Boundary::try_read_scanlines`] with the default strategy.
pub fn try_read_scanlines(session: &mut Decompress<'_>, buf: &mut [u8], max_lines: usize) -> bool {
    Boundary::default().try_read_scanlines(session, buf, max_lines)
}

/// [`Boundary::try_finish_decompress`] with the default strategy.
pub fn try_finish_decompress(session: &mut Decompress<'_>) -> bool {
    Boundary::default().try_finish_decompress(session)
}
