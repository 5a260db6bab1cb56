// src/crash.rs
//
// Crash context for memory faults. The CLI records what it is working on
// (reading, decoding or writing a file) in a fixed, lock-free stack, and a
// SIGSEGV/SIGBUS handler prints that stack before the process dies. The
// stack is process-wide and meant for the CLI's main thread; library code
// does not touch it.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Maximum context entries (stack depth)
const MAX_CONTEXT_DEPTH: usize = 8;
/// Maximum length of each context entry
const MAX_CONTEXT_LEN: usize = 128;

#[allow(clippy::declare_interior_mutable_const)]
static CONTEXT_STACK: [[AtomicU8; MAX_CONTEXT_LEN]; MAX_CONTEXT_DEPTH] = {
    const INIT_BYTE: AtomicU8 = AtomicU8::new(0);
    const INIT_ENTRY: [AtomicU8; MAX_CONTEXT_LEN] = [INIT_BYTE; MAX_CONTEXT_LEN];
    [INIT_ENTRY; MAX_CONTEXT_DEPTH]
};
#[allow(clippy::declare_interior_mutable_const)]
static CONTEXT_LENS: [AtomicUsize; MAX_CONTEXT_DEPTH] = {
    const INIT: AtomicUsize = AtomicUsize::new(0);
    [INIT; MAX_CONTEXT_DEPTH]
};
static CONTEXT_DEPTH: AtomicUsize = AtomicUsize::new(0);

static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

fn store_entry(idx: usize, ctx: &str) {
    let bytes = ctx.as_bytes();
    let len = bytes.len().min(MAX_CONTEXT_LEN);
    for (slot, &b) in CONTEXT_STACK[idx].iter().zip(&bytes[..len]) {
        slot.store(b, Ordering::Relaxed);
    }
    CONTEXT_LENS[idx].store(len, Ordering::Release);
}

/// Push a context entry, e.g. `"decoding logo.qoi"`.
///
/// Entries past the maximum depth are counted but not recorded, so pushes
/// and pops stay balanced.
pub fn push_context(ctx: &str) {
    let depth = CONTEXT_DEPTH.fetch_add(1, Ordering::AcqRel);
    if depth < MAX_CONTEXT_DEPTH {
        store_entry(depth, ctx);
    }
}

pub fn pop_context() {
    let _ = CONTEXT_DEPTH.fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1));
}

/// Replace the top entry; pushes if the stack is empty.
pub fn replace_context(ctx: &str) {
    let depth = CONTEXT_DEPTH.load(Ordering::Acquire);
    match depth {
        0 => push_context(ctx),
        d if d <= MAX_CONTEXT_DEPTH => store_entry(d - 1, ctx),
        _ => {}
    }
}

pub fn clear_context() {
    CONTEXT_DEPTH.store(0, Ordering::Release);
}

/// Snapshot of the recorded entries, outermost first.
pub fn current_context() -> Vec<String> {
    let depth = CONTEXT_DEPTH.load(Ordering::Acquire).min(MAX_CONTEXT_DEPTH);
    (0..depth)
        .map(|i| {
            let len = CONTEXT_LENS[i].load(Ordering::Acquire);
            let bytes: Vec<u8> = CONTEXT_STACK[i][..len]
                .iter()
                .map(|b| b.load(Ordering::Relaxed))
                .collect();
            String::from_utf8_lossy(&bytes).into_owned()
        })
        .collect()
}

/// Pops its entry when dropped.
#[must_use = "the context is popped as soon as the guard is dropped"]
pub struct ContextGuard(());

impl ContextGuard {
    /// Update the entry this guard pushed.
    pub fn update(&self, ctx: &str) {
        replace_context(ctx);
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        pop_context();
    }
}

/// Push `ctx` for the lifetime of the returned guard.
pub fn enter(ctx: &str) -> ContextGuard {
    push_context(ctx);
    ContextGuard(())
}

/// Install the SIGSEGV/SIGBUS handler. Only the first call installs it.
pub fn install_segfault_handler() {
    if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = fault_handler as usize;
        action.sa_flags = libc::SA_SIGINFO;

        libc::sigaction(libc::SIGSEGV, &action, std::ptr::null_mut());
        libc::sigaction(libc::SIGBUS, &action, std::ptr::null_mut());
    }
}

fn write_stderr(bytes: &[u8]) {
    // Safety: plain write(2) on fd 2, async-signal-safe.
    unsafe {
        libc::write(2, bytes.as_ptr().cast::<libc::c_void>(), bytes.len());
    }
}

/// Signal handler - must be async-signal-safe
extern "C" fn fault_handler(sig: libc::c_int, _info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
    if sig == libc::SIGSEGV {
        write_stderr(b"\nscanguard: segmentation fault");
    } else {
        write_stderr(b"\nscanguard: bus error");
    }

    let depth = CONTEXT_DEPTH.load(Ordering::Acquire).min(MAX_CONTEXT_DEPTH);
    if depth > 0 {
        write_stderr(b" while ");
        for i in 0..depth {
            if i > 0 {
                write_stderr(b" > ");
            }
            let len = CONTEXT_LENS[i].load(Ordering::Acquire);
            let mut buf = [0u8; MAX_CONTEXT_LEN];
            for (dst, src) in buf.iter_mut().zip(&CONTEXT_STACK[i][..len]) {
                *dst = src.load(Ordering::Relaxed);
            }
            write_stderr(&buf[..len]);
        }
    }
    write_stderr(b"\n");

    // Re-raise with the default disposition for a core dump.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = libc::SIG_DFL;
        libc::sigaction(sig, &action, std::ptr::null_mut());
        libc::raise(sig);
    }
}
