//! Cancellation and deadline shared by every remote call in a run.

use crate::error::{Result, TallyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cloneable, cancellable run context.
///
/// Clones share the same cancellation flag, so a Ctrl-C handler can hold one
/// copy while the pipeline checks another.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once cancelled or past the deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Return `Err(Cancelled)` when the context is done.
    pub fn check(&self) -> Result<()> {
        if self.is_done() {
            Err(TallyError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Time left before the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Install a Ctrl-C handler that cancels this context.
    ///
    /// Failure to install is logged and otherwise ignored.
    pub fn cancel_on_interrupt(&self) {
        let flag = Arc::clone(&self.cancelled);
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        }) {
            tracing::debug!("Could not install interrupt handler: {}", e);
        }
    }
}
