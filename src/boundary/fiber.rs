// src/boundary/fiber.rs
//
// Fiber strategy: the risky call runs on its own corosensei stack. The
// shadow's `error_exit` suspends the fiber back to the boundary, which then
// unwinds the abandoned fiber from the boundary's own stack.

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};
use scanguard_engine::Decompress;

use super::Outcome;
use super::guard::BindingGuard;
use super::shadow::{Resumption, ShadowReporter};

/// State shared between the boundary and the fiber body.
///
/// Lives on the boundary's stack; the fiber only sees its address.
struct FiberCall<S, F, R> {
    session: *mut S,
    shadow: *mut ShadowReporter,
    op: Option<F>,
    out: Option<R>,
}

/// Fiber entry point, monomorphized per call site so the coroutine body
/// itself captures nothing but plain addresses.
///
/// # Safety
/// `call` must point to a live `FiberCall<S, F, R>` whose `session` and
/// `shadow` are valid for the whole fiber run.
unsafe fn enter<S, F, R>(call: *mut (), yielder: &Yielder<(), Resumption>)
where
    F: FnOnce(&mut S) -> R,
{
    let call = unsafe { &mut *call.cast::<FiberCall<S, F, R>>() };
    // Capture the resumption context before anything can fail.
    unsafe { (*call.shadow).arm_fiber(yielder) };
    if let Some(op) = call.op.take() {
        let session = unsafe { &mut *call.session };
        call.out = Some(op(session));
    }
}

pub(super) fn protect<'r, R, F>(session: &mut Decompress<'r>, stack_size: usize, op: F) -> Outcome<R>
where
    F: FnOnce(&mut Decompress<'r>) -> R,
{
    let stack = match DefaultStack::new(stack_size) {
        Ok(stack) => stack,
        Err(err) => {
            tracing::warn!(stack_size, %err, "fiber stack unavailable, unwinding instead");
            return super::unwind::protect(session, op);
        }
    };

    let mut shadow = ShadowReporter::for_session(session);
    let mut guard = BindingGuard::install(session, &mut shadow);

    let mut call = FiberCall {
        session: guard.session() as *mut Decompress<'r>,
        shadow: guard.shadow_ptr(),
        op: Some(op),
        out: None,
    };
    let entry: unsafe fn(*mut (), &Yielder<(), Resumption>) = enter::<Decompress<'r>, F, R>;
    let call_addr = &mut call as *mut FiberCall<Decompress<'r>, F, R> as usize;

    let mut fiber: Coroutine<(), Resumption, (), DefaultStack> =
        Coroutine::with_stack(stack, move |yielder, ()| {
            // Safety: the boundary keeps `call` alive until the fiber is
            // finished or abandoned.
            unsafe { entry(call_addr as *mut (), yielder) }
        });

    let outcome = match fiber.resume(()) {
        CoroutineResult::Return(()) => match call.out.take() {
            Some(value) => Outcome::Success(value),
            None => Outcome::Failure,
        },
        CoroutineResult::Yield(resumption) => {
            debug_assert_eq!(resumption.token, guard.shadow_ptr() as usize);
            // Drops whatever is still live on the fiber, including the
            // guards of boundaries nested inside the operation.
            fiber.force_unwind();
            Outcome::Failure
        }
    };
    drop(fiber);
    drop(guard);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanguard_engine::{ErrorMgr, Message};

    #[test]
    fn success_runs_on_the_fiber() {
        let mut err = ErrorMgr::diagnostic();
        let mut session = Decompress::new(&mut err);

        let outcome = protect(&mut session, 64 * 1024, |s| {
            s.out_color_space = scanguard_engine::ColorSpace::Bgra;
            7
        });
        assert_eq!(outcome, Outcome::Success(7));
        assert_eq!(session.out_color_space, scanguard_engine::ColorSpace::Bgra);
    }

    #[test]
    fn fatal_error_abandons_the_fiber() {
        let mut err = ErrorMgr::diagnostic();
        let mut session = Decompress::new(&mut err);
        let before = session.error_binding();

        let outcome = protect(&mut session, 64 * 1024, |s| s.read_header(true));
        assert_eq!(outcome, Outcome::Failure);
        assert_eq!(session.error_binding(), before);
        drop(session);
        assert_eq!(err.msg_code, Some(Message::NoSource));
    }
}
