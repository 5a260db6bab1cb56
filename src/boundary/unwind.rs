// src/boundary/unwind.rs
//
// Unwind strategy: the shadow's `error_exit` raises a tagged unwind and the
// boundary catches it on the same stack.

use std::panic::{self, AssertUnwindSafe};

use scanguard_engine::Decompress;

use super::Outcome;
use super::guard::BindingGuard;
use super::shadow::{Resumption, ShadowReporter};

pub(super) fn protect<'r, R, F>(session: &mut Decompress<'r>, op: F) -> Outcome<R>
where
    F: FnOnce(&mut Decompress<'r>) -> R,
{
    let mut shadow = ShadowReporter::for_session(session);
    let token = shadow.arm_unwind();

    let mut guard = BindingGuard::install(session, &mut shadow);
    let result = panic::catch_unwind(AssertUnwindSafe(|| op(guard.session())));
    drop(guard);

    match result {
        Ok(value) => Outcome::Success(value),
        Err(payload) => match payload.downcast::<Resumption>() {
            Ok(resumption) if resumption.token == token => Outcome::Failure,
            // Another boundary further up owns this one.
            Ok(resumption) => panic::resume_unwind(resumption),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}
