// src/boundary/shadow.rs
//
// The shadow reporter: a per-call copy of the session's error manager whose
// `error_exit` forwards to the original and then resumes at the boundary.

use std::panic;

use corosensei::Yielder;
use scanguard_engine::{Decompress, ErrorExitFn, ErrorMgr};

/// Payload carried from the shadow `error_exit` back to the boundary.
///
/// `token` is the address of the shadow that raised it, so a boundary only
/// ever absorbs failures from its own session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resumption {
    pub token: usize,
}

/// Captured resumption context.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResumeSlot {
    Unarmed,
    /// Unwind to the `catch_unwind` frame waiting for `token`.
    Unwind { token: usize },
    /// Suspend the fiber running the risky call.
    Fiber {
        yielder: *const Yielder<(), Resumption>,
        token: usize,
    },
}

impl ResumeSlot {
    /// Transfer control back to the boundary. Returns only if the slot was
    /// never armed, in which case the engine's own never-returns check fires.
    fn resume(self) {
        match self {
            ResumeSlot::Unarmed => {}
            ResumeSlot::Unwind { token } => {
                // resume_unwind skips the panic hook: this is control flow,
                // not a bug report.
                panic::resume_unwind(Box::new(Resumption { token }));
            }
            ResumeSlot::Fiber { yielder, token } => {
                // Safety: the yielder belongs to the fiber currently running
                // this handler. The boundary never resumes it normally, so
                // `suspend` only comes back by unwinding.
                unsafe { (*yielder).suspend(Resumption { token }) };
            }
        }
    }
}

/// Stand-in error manager bound to a session for the duration of one call.
///
/// `#[repr(C)]` with the table first, so a pointer to the shadow is a valid
/// `*mut ErrorMgr` for the engine.
#[repr(C)]
#[derive(Debug)]
pub(crate) struct ShadowReporter {
    table: ErrorMgr,
    original_exit: ErrorExitFn,
    resume: ResumeSlot,
}

impl ShadowReporter {
    /// Copy the table currently bound to `session` and route its fatal
    /// entry point through the shadow.
    pub(crate) fn for_session(session: &Decompress<'_>) -> Self {
        let binding = session.error_binding();
        // Safety: a session's binding is live for as long as it stays bound.
        let original = unsafe { binding.as_ref() };
        let original_exit = if is_shadow_table(original) {
            // Nested on the same session: the binding is an enclosing
            // shadow, which already knows the real handler. Read it through
            // the binding itself, whose provenance covers the whole shadow.
            // Safety: a table carrying `shadow_error_exit` is always the
            // first field of a live, bound `ShadowReporter`.
            unsafe { binding.cast::<ShadowReporter>().as_ref() }.original_exit
        } else {
            original.error_exit
        };
        ShadowReporter {
            table: ErrorMgr {
                error_exit: shadow_error_exit,
                ..*original
            },
            original_exit,
            resume: ResumeSlot::Unarmed,
        }
    }

    /// The dispatch table the engine sees while the shadow is bound.
    pub(crate) fn table(&self) -> &ErrorMgr {
        &self.table
    }

    /// Identity of this shadow. Only meaningful while it stays in place.
    pub(crate) fn token(&self) -> usize {
        self as *const ShadowReporter as usize
    }

    pub(crate) fn arm_unwind(&mut self) -> usize {
        let token = self.token();
        self.resume = ResumeSlot::Unwind { token };
        token
    }

    pub(crate) fn arm_fiber(&mut self, yielder: &Yielder<(), Resumption>) -> usize {
        let token = self.token();
        self.resume = ResumeSlot::Fiber {
            yielder: yielder as *const Yielder<(), Resumption>,
            token,
        };
        token
    }
}

fn is_shadow_table(table: &ErrorMgr) -> bool {
    std::ptr::fn_addr_eq(table.error_exit, shadow_error_exit as ErrorExitFn)
}

/// `error_exit` installed by every shadow.
///
/// Runs the original fatal handler first so its diagnostics still surface,
/// then leaves the engine through the captured resumption context.
fn shadow_error_exit(session: &mut Decompress<'_>) {
    // Copy what we need out of the shadow before handing the session to
    // code that may write through the binding.
    let (original_exit, resume) = {
        let shadow = session.error_binding().cast::<ShadowReporter>();
        // Safety: this function is only reachable through a bound shadow.
        let shadow = unsafe { shadow.as_ref() };
        (shadow.original_exit, shadow.resume)
    };
    original_exit(session);
    resume.resume();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::guard::BindingGuard;

    #[test]
    fn table_copies_everything_but_error_exit() {
        let mut original = ErrorMgr {
            trace_level: 2,
            ..ErrorMgr::diagnostic()
        };
        let original_exit = original.error_exit;
        let original_output = original.output_message;
        let mut session = Decompress::new(&mut original);
        session.reporter_mut().num_warnings = 5;
        let shadow = ShadowReporter::for_session(&session);

        let table = shadow.table();
        assert_eq!(table.trace_level, 2);
        assert_eq!(table.num_warnings, 5);
        assert!(std::ptr::fn_addr_eq(table.output_message, original_output));
        assert!(std::ptr::fn_addr_eq(shadow.original_exit, original_exit));
        assert!(!std::ptr::fn_addr_eq(table.error_exit, original_exit));
    }

    #[test]
    fn nested_shadow_forwards_to_the_real_handler() {
        let mut original = ErrorMgr::diagnostic();
        let original_exit = original.error_exit;
        let mut session = Decompress::new(&mut original);

        let mut outer = ShadowReporter::for_session(&session);
        let mut guard = BindingGuard::install(&mut session, &mut outer);
        let inner = ShadowReporter::for_session(guard.session());
        assert!(is_shadow_table(guard.session().reporter()));
        assert!(std::ptr::fn_addr_eq(inner.original_exit, original_exit));
    }

    #[test]
    fn starts_unarmed() {
        let mut err = ErrorMgr::std();
        let session = Decompress::new(&mut err);
        let shadow = ShadowReporter::for_session(&session);
        assert!(matches!(shadow.resume, ResumeSlot::Unarmed));
    }

    #[test]
    fn arming_records_the_shadow_address() {
        let mut err = ErrorMgr::std();
        let session = Decompress::new(&mut err);
        let mut shadow = ShadowReporter::for_session(&session);
        let token = shadow.arm_unwind();
        assert_eq!(token, &shadow as *const ShadowReporter as usize);
        assert!(matches!(shadow.resume, ResumeSlot::Unwind { token: t } if t == token));
    }

    #[test]
    fn unwind_slot_raises_resumption() {
        let slot = ResumeSlot::Unwind { token: 42 };
        let payload = panic::catch_unwind(panic::AssertUnwindSafe(|| slot.resume())).unwrap_err();
        assert_eq!(
            payload.downcast_ref::<Resumption>(),
            Some(&Resumption { token: 42 })
        );
    }
}
