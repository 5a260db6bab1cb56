// src/boundary/guard.rs
//
// Scoped installation of a shadow reporter. The original binding comes back
// when the guard drops, whichever way the boundary is left.

use std::marker::PhantomData;
use std::ptr::NonNull;

use scanguard_engine::{Decompress, ErrorMgr};

use super::shadow::ShadowReporter;

pub(crate) struct BindingGuard<'s, 'r> {
    session: &'s mut Decompress<'r>,
    original: NonNull<ErrorMgr>,
    shadow: NonNull<ShadowReporter>,
    _shadow: PhantomData<&'s mut ShadowReporter>,
}

impl<'s, 'r> BindingGuard<'s, 'r> {
    /// Bind `shadow` in place of the session's current error manager.
    pub(crate) fn install(session: &'s mut Decompress<'r>, shadow: &'s mut ShadowReporter) -> Self {
        let shadow = NonNull::from(shadow);
        // Safety: `shadow` is borrowed for as long as the guard lives and the
        // guard rebinds `original` before that borrow ends.
        let original = unsafe { session.replace_error_binding(shadow.cast()) };
        BindingGuard {
            session,
            original,
            shadow,
            _shadow: PhantomData,
        }
    }

    pub(crate) fn session(&mut self) -> &mut Decompress<'r> {
        self.session
    }

    /// Raw access to the bound shadow, for arming it from inside a fiber.
    pub(crate) fn shadow_ptr(&self) -> *mut ShadowReporter {
        self.shadow.as_ptr()
    }
}

impl Drop for BindingGuard<'_, '_> {
    fn drop(&mut self) {
        // Safety: `original` was the binding before install and is still live.
        let bound = unsafe { self.session.replace_error_binding(self.original) };
        debug_assert_eq!(
            bound,
            self.shadow.cast::<ErrorMgr>(),
            "error binding changed underneath an active boundary"
        );

        // The engine recorded its diagnostics in the shadow's table; hand
        // them to the caller's reporter. Entry points stay untouched.
        // Safety: the shadow outlives the guard.
        let table = unsafe { self.shadow.as_ref() }.table();
        let (msg_code, num_warnings) = (table.msg_code, table.num_warnings);
        let original = self.session.reporter_mut();
        original.msg_code = msg_code;
        original.num_warnings = num_warnings;
    }
}
