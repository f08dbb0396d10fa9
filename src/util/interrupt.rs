use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to the process-wide interrupt flag.
/// A terminal Ctrl-C also reaches the running iostat child (same process
/// group), so the blocking sample returns promptly.
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(SigHandler::Handler(on_signal), SaFlags::empty(), SigSet::empty());
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic.
        unsafe { signal::sigaction(sig, &action)?; }
    }
    Ok(())
}

/// Cancellation flag observed by the refresh loop between phases.
#[derive(Debug, Clone, Copy)]
pub struct Interrupt(&'static AtomicBool);

impl Interrupt {
    /// The flag set by the handlers from [`install`].
    pub fn signal() -> Self {
        Interrupt(&INTERRUPTED)
    }

    #[cfg(test)]
    pub fn new(flag: &'static AtomicBool) -> Self {
        Interrupt(flag)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
