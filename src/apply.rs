//! Applies remotely-sourced content to a live buffer.
//!
//! The replacement is one atomic edit, the viewport is preserved across it,
//! and the changed region gets a short-lived `"diff"` marker so the edit is
//! visible without stealing the user's scroll position.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::diff;
use crate::editor::{EditorHost, ViewId};

/// Name of the transient changed-region marker.
pub const DIFF_MARKER: &str = "diff";

/// Whole-buffer content applier.
///
/// Cheap to clone; the marker generations are shared so a clear timer from
/// an older apply never erases the marker of a newer one.
#[derive(Clone)]
pub struct BufferApplier {
    /// How long the changed-region marker lingers before it is cleared.
    marker_linger: Duration,
    /// Time budget for the changed-region diff.
    diff_budget: Duration,
    /// Per-view marker generation; bumped on every apply.
    generations: Arc<Mutex<HashMap<ViewId, u64>>>,
}

impl BufferApplier {
    pub fn new(marker_linger: Duration, diff_budget: Duration) -> Self {
        Self {
            marker_linger,
            diff_budget,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace the view's content with `new_content`.
    ///
    /// No-op when the content already matches, so redundant remote updates
    /// create neither an undo step nor marker churn.
    pub fn apply<E: EditorHost>(&self, editor: &E, view: ViewId, new_content: &str) {
        let old_content = editor.view_text(view);
        if old_content == new_content {
            return;
        }

        let viewport = editor.viewport(view);
        editor.replace_text(view, new_content);

        let region = diff::changed_region(&old_content, new_content, self.diff_budget);
        if !region.is_empty() {
            editor.add_marker(view, DIFF_MARKER, region);
            self.schedule_marker_clear(editor, view);
        }

        editor.set_viewport(view, viewport);
        // The host may re-layout asynchronously after the edit; restore
        // once more when it settles.
        let later = editor.clone();
        editor.set_timeout(
            Duration::ZERO,
            Box::new(move || later.set_viewport(view, viewport)),
        );
    }

    fn schedule_marker_clear<E: EditorHost>(&self, editor: &E, view: ViewId) {
        let generation = {
            let mut generations = self
                .generations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let entry = generations.entry(view).or_insert(0);
            *entry += 1;
            *entry
        };
        let generations = Arc::clone(&self.generations);
        let later = editor.clone();
        editor.set_timeout(
            self.marker_linger,
            Box::new(move || {
                let current = generations
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&view)
                    .copied()
                    .unwrap_or(0);
                // A newer apply owns the marker now; leave it alone.
                if current == generation {
                    later.erase_marker(view, DIFF_MARKER);
                }
            }),
        );
    }
}
