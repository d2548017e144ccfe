//! Deferred navigation for views that are still loading.
//!
//! Single slot, not a queue: only one navigation is meaningful at a time,
//! so a newer request simply overwrites an unapplied one.

use std::path::{Path, PathBuf};

/// At most one outstanding "reveal this line" request.
#[derive(Debug, Default)]
pub struct PendingReveal {
    slot: Option<(PathBuf, u32)>,
}

impl PendingReveal {
    /// Record a deferred navigation. Last request wins.
    pub fn record(&mut self, file: PathBuf, line: u32) {
        self.slot = Some((file, line));
    }

    /// Take the deferred line if it targets `file`, clearing the slot.
    pub fn take_for(&mut self, file: &Path) -> Option<u32> {
        match &self.slot {
            Some((pending, line)) if pending == file => {
                let line = *line;
                self.slot = None;
                Some(line)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}
