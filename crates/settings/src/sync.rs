//! Guard against refreshing the template editor under a local edit.
//!
//! A local edit pushes the new text into the model, which would normally
//! trigger a model-to-view refresh and reset the caret. The guard lets the
//! view skip refreshes for a short window after each local edit.

use std::time::Duration;
use tokio::time::Instant;

/// Window during which model-to-view refreshes are skipped.
pub const EDIT_SYNC_WINDOW: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct EditSyncGuard {
    window: Duration,
    suspended_until: Option<Instant>,
}

impl Default for EditSyncGuard {
    fn default() -> Self {
        Self::new(EDIT_SYNC_WINDOW)
    }
}

impl EditSyncGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            suspended_until: None,
        }
    }

    /// Record a local edit; refreshes are suspended for the window.
    pub fn suspend(&mut self) {
        self.suspended_until = Some(Instant::now() + self.window);
    }

    /// Allow refreshes again right away.
    pub fn resume(&mut self) {
        self.suspended_until = None;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Whether the view should pull the model now.
    pub fn should_refresh(&mut self) -> bool {
        if self.is_suspended() {
            return false;
        }
        self.suspended_until = None;
        true
    }
}
