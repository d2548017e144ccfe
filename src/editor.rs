//! Capability surface consumed from the editor host.
//!
//! The editor's buffer storage, lifecycle notifications, window addressing
//! and project-file globbing are external collaborators. The sync core only
//! reaches them through [`EditorHost`], which keeps the core testable
//! against an in-memory double and keeps buffer mutation confined to
//! whatever serial context the host runs its callbacks on.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Opaque handle for one editor window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Opaque handle for one view (an open buffer shown in a window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

/// Scroll position of a view, in editor layout coordinates.
///
/// Restoring a stale viewport after the content length changed is fine;
/// the host clamps out-of-range positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
}

/// A contiguous byte span in a view's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width region at `offset`.
    pub fn empty_at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Everything the sync core needs from the hosting editor.
///
/// Implementations are expected to be cheap to clone (a handle onto shared
/// host state); clones are captured by deferred callbacks scheduled through
/// [`EditorHost::set_timeout`].
///
/// All methods are called from the host's serial callback context, never
/// from the transport's receive thread.
pub trait EditorHost: Clone + Send + 'static {
    /// All open windows.
    fn windows(&self) -> Vec<WindowId>;

    /// Folders opened in a window (project directories).
    fn window_folders(&self, window: WindowId) -> Vec<PathBuf>;

    /// The view in `window` currently showing `file`, if any.
    fn find_open_view(&self, window: WindowId, file: &Path) -> Option<ViewId>;

    /// Find-or-open a view for `file` in `window`. Opening may kick off an
    /// asynchronous load; check [`EditorHost::is_loading`] before touching
    /// the content.
    fn open_view(&self, window: WindowId, file: &Path) -> Option<ViewId>;

    /// File backing the view, if it has one.
    fn file_path(&self, view: ViewId) -> Option<PathBuf>;

    /// Whether the view's content is still loading asynchronously.
    fn is_loading(&self, view: ViewId) -> bool;

    /// Full text of the view's buffer.
    fn view_text(&self, view: ViewId) -> String;

    /// Replace the entire buffer content as one atomic edit (one undo step).
    fn replace_text(&self, view: ViewId, text: &str);

    /// Persist the buffer to disk.
    fn save(&self, view: ViewId);

    fn viewport(&self, view: ViewId) -> Viewport;

    fn set_viewport(&self, view: ViewId, viewport: Viewport);

    /// Drop any existing selection.
    fn clear_selection(&self, view: ViewId);

    /// Set the selection to a zero-width point at `offset`.
    fn select_point(&self, view: ViewId, offset: usize);

    /// Scroll so that `region` is visible.
    fn show(&self, view: ViewId, region: Region);

    /// Add (or replace) the named transient marker over `region`.
    fn add_marker(&self, view: ViewId, key: &str, region: Region);

    /// Erase the named transient marker, if present.
    fn erase_marker(&self, view: ViewId, key: &str);

    /// Give the view input focus.
    fn focus(&self, view: ViewId);

    /// All files named `file_name` anywhere under `folder`, including
    /// directly inside it. Backed by the host's globbing facility.
    fn find_marker_files(&self, folder: &Path, file_name: &str) -> Vec<PathBuf>;

    /// Run `callback` on the host's serial context after `delay`.
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce() + Send + 'static>);
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory editor double used by the unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};

    pub(crate) struct ViewState {
        pub window: WindowId,
        pub path: Option<PathBuf>,
        pub text: String,
        pub loading: bool,
        pub viewport: Viewport,
        pub selection: Vec<Region>,
        pub markers: HashMap<String, Region>,
        pub edits: u32,
        pub saves: u32,
        pub shown: Vec<Region>,
        pub focused: bool,
    }

    impl ViewState {
        fn new(window: WindowId, path: PathBuf, text: String, loading: bool) -> Self {
            Self {
                window,
                path: Some(path),
                text,
                loading,
                viewport: Viewport::default(),
                selection: Vec::new(),
                markers: HashMap::new(),
                edits: 0,
                saves: 0,
                shown: Vec::new(),
                focused: false,
            }
        }
    }

    #[derive(Default)]
    struct State {
        windows: Vec<WindowId>,
        folders: HashMap<WindowId, Vec<PathBuf>>,
        views: HashMap<ViewId, ViewState>,
        view_order: Vec<ViewId>,
        next_view: u64,
        disk: HashMap<PathBuf, String>,
        markers_on_disk: HashMap<PathBuf, Vec<PathBuf>>,
        open_creates_loading: bool,
        timeouts: Vec<(Duration, Box<dyn FnOnce() + Send>)>,
    }

    /// Cloneable handle onto shared fake-editor state.
    #[derive(Clone, Default)]
    pub(crate) struct FakeEditor {
        state: Arc<Mutex<State>>,
    }

    impl FakeEditor {
        pub fn new() -> Self {
            let editor = Self::default();
            editor.add_window(WindowId(1));
            editor
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn add_window(&self, window: WindowId) {
            self.lock().windows.push(window);
        }

        pub fn add_folder(&self, window: WindowId, folder: impl Into<PathBuf>) {
            self.lock()
                .folders
                .entry(window)
                .or_default()
                .push(folder.into());
        }

        pub fn set_marker_files(&self, folder: impl Into<PathBuf>, markers: Vec<PathBuf>) {
            self.lock().markers_on_disk.insert(folder.into(), markers);
        }

        pub fn set_disk_content(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
            self.lock().disk.insert(path.into(), text.into());
        }

        /// Newly opened views start in the loading state.
        pub fn open_creates_loading(&self, loading: bool) {
            self.lock().open_creates_loading = loading;
        }

        pub fn open_view_in(
            &self,
            window: WindowId,
            path: impl Into<PathBuf>,
            text: impl Into<String>,
        ) -> ViewId {
            let mut state = self.lock();
            state.next_view += 1;
            let id = ViewId(state.next_view);
            state
                .views
                .insert(id, ViewState::new(window, path.into(), text.into(), false));
            state.view_order.push(id);
            id
        }

        pub fn set_loading(&self, view: ViewId, loading: bool) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.loading = loading;
            }
        }

        pub fn set_view_viewport(&self, view: ViewId, viewport: Viewport) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.viewport = viewport;
            }
        }

        pub fn with_view<T>(&self, view: ViewId, f: impl FnOnce(&ViewState) -> T) -> T {
            f(self.lock().views.get(&view).expect("no such view"))
        }

        pub fn text(&self, view: ViewId) -> String {
            self.with_view(view, |v| v.text.clone())
        }

        pub fn marker(&self, view: ViewId, key: &str) -> Option<Region> {
            self.with_view(view, |v| v.markers.get(key).copied())
        }

        pub fn timeout_count(&self) -> usize {
            self.lock().timeouts.len()
        }

        /// Run the oldest scheduled callback. Returns false when none is
        /// queued. Callbacks scheduled while running are queued behind.
        pub fn run_next_timeout(&self) -> bool {
            let next = {
                let mut state = self.lock();
                if state.timeouts.is_empty() {
                    return false;
                }
                state.timeouts.remove(0)
            };
            (next.1)();
            true
        }

        /// Drain and run every scheduled callback, including ones scheduled
        /// while draining.
        pub fn run_all_timeouts(&self) {
            while self.run_next_timeout() {}
        }
    }

    impl EditorHost for FakeEditor {
        fn windows(&self) -> Vec<WindowId> {
            self.lock().windows.clone()
        }

        fn window_folders(&self, window: WindowId) -> Vec<PathBuf> {
            self.lock().folders.get(&window).cloned().unwrap_or_default()
        }

        fn find_open_view(&self, window: WindowId, file: &Path) -> Option<ViewId> {
            let state = self.lock();
            state
                .view_order
                .iter()
                .copied()
                .find(|id| {
                    state
                        .views
                        .get(id)
                        .is_some_and(|v| v.window == window && v.path.as_deref() == Some(file))
                })
        }

        fn open_view(&self, window: WindowId, file: &Path) -> Option<ViewId> {
            if let Some(existing) = self.find_open_view(window, file) {
                return Some(existing);
            }
            let mut state = self.lock();
            state.next_view += 1;
            let id = ViewId(state.next_view);
            let text = state.disk.get(file).cloned().unwrap_or_default();
            let loading = state.open_creates_loading;
            state
                .views
                .insert(id, ViewState::new(window, file.to_path_buf(), text, loading));
            state.view_order.push(id);
            Some(id)
        }

        fn file_path(&self, view: ViewId) -> Option<PathBuf> {
            self.lock().views.get(&view).and_then(|v| v.path.clone())
        }

        fn is_loading(&self, view: ViewId) -> bool {
            self.lock().views.get(&view).is_some_and(|v| v.loading)
        }

        fn view_text(&self, view: ViewId) -> String {
            self.lock()
                .views
                .get(&view)
                .map(|v| v.text.clone())
                .unwrap_or_default()
        }

        fn replace_text(&self, view: ViewId, text: &str) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.text = text.to_string();
                v.edits += 1;
            }
        }

        fn save(&self, view: ViewId) {
            let mut state = self.lock();
            if let Some(v) = state.views.get_mut(&view) {
                v.saves += 1;
                let entry = v.path.clone().zip(Some(v.text.clone()));
                if let Some((path, text)) = entry {
                    state.disk.insert(path, text);
                }
            }
        }

        fn viewport(&self, view: ViewId) -> Viewport {
            self.lock()
                .views
                .get(&view)
                .map(|v| v.viewport)
                .unwrap_or_default()
        }

        fn set_viewport(&self, view: ViewId, viewport: Viewport) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.viewport = viewport;
            }
        }

        fn clear_selection(&self, view: ViewId) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.selection.clear();
            }
        }

        fn select_point(&self, view: ViewId, offset: usize) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.selection.push(Region::empty_at(offset));
            }
        }

        fn show(&self, view: ViewId, region: Region) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.shown.push(region);
            }
        }

        fn add_marker(&self, view: ViewId, key: &str, region: Region) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.markers.insert(key.to_string(), region);
            }
        }

        fn erase_marker(&self, view: ViewId, key: &str) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.markers.remove(key);
            }
        }

        fn focus(&self, view: ViewId) {
            if let Some(v) = self.lock().views.get_mut(&view) {
                v.focused = true;
            }
        }

        fn find_marker_files(&self, folder: &Path, file_name: &str) -> Vec<PathBuf> {
            self.lock()
                .markers_on_disk
                .get(folder)
                .map(|markers| {
                    markers
                        .iter()
                        .filter(|m| m.file_name().is_some_and(|n| n == file_name))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }

        fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce() + Send + 'static>) {
            self.lock().timeouts.push((delay, callback));
        }
    }
}
