use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// Receives the forced jump back to the login screen after an unrecoverable
/// authorization failure
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator that only logs; for headless use
#[derive(Debug, Clone, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {
        info!("Login redirect requested (no UI attached)");
    }
}

/// Navigator that records pending redirects for a polling UI loop
#[derive(Debug, Default)]
pub struct FlagNavigator {
    pending: AtomicUsize,
}

impl FlagNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of redirects requested and not yet taken
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Consume pending redirects; true if there was at least one
    pub fn take_redirect(&self) -> bool {
        self.pending.swap(0, Ordering::SeqCst) > 0
    }
}

impl Navigator for FlagNavigator {
    fn redirect_to_login(&self) {
        info!("Redirecting to login screen");
        self.pending.fetch_add(1, Ordering::SeqCst);
    }
}
