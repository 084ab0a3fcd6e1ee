//! Two-phase cancellation token.

use std::sync::atomic::{AtomicBool, Ordering};

/// One token per script run; never reset.
///
/// `request_stop` asks the script to unwind cooperatively. `force_stop`
/// additionally fences the script's host handle: any later world access
/// through it fails fast with [`crate::ScriptError::Interrupted`].
#[derive(Debug, Default)]
pub struct CancellationToken {
    stop_requested: AtomicBool,
    forced: AtomicBool,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn force_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.forced.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn is_forced(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationToken;
    use pretty_assertions::assert_eq;

    #[test]
    fn force_stop_implies_stop_requested() {
        let token = CancellationToken::new();
        assert_eq!(token.is_stop_requested(), false);
        token.force_stop();
        assert_eq!(token.is_stop_requested(), true);
        assert_eq!(token.is_forced(), true);
    }
}
