//! Central sync state machine.
//!
//! The controller maps editor lifecycle hooks onto outbound frontend
//! commands and inbound frontend notifications onto buffer mutations and
//! navigation. All of its methods run on the editor's serial callback
//! context; the transport's receive tasks only talk to it through the
//! [`TransportEvent`] channel returned by [`SyncController::new`], which
//! the embedding adapter drains from that same context.
//!
//! Loop prevention: before a remote edit is applied the target view is
//! muted, so the modification/save hooks the edit triggers produce no
//! outbound echo. The mute is a scoped guard — every exit path unmutes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::apply::BufferApplier;
use crate::editor::{EditorHost, Region, ViewId};
use crate::protocol::{FrontendCommand, FrontendEvent};
use crate::reveal::PendingReveal;
use crate::roots::ProjectRoots;
use crate::transport::{SocketClient, TransportEvent};

/// Name of the transient navigation marker.
pub const REVEAL_MARKER: &str = "reveal";

/// Controller policy and endpoint settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Frontend endpoint.
    pub frontend_url: String,
    /// Sub-protocols offered during the handshake.
    pub subprotocols: Vec<String>,
    /// Gate outbound sync on project-root membership. When off, every
    /// buffer with a file path is in scope.
    pub scope_to_project_roots: bool,
    /// Marker file that makes its containing directory a project root.
    pub marker_file_name: String,
    /// How long the changed-region marker lingers after a remote edit.
    pub marker_linger: Duration,
    /// Time budget for changed-region diffs.
    pub diff_budget: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            frontend_url: "ws://127.0.0.1:9222/devtools/frontend_api".to_string(),
            subprotocols: vec!["http-only".to_string(), "chat".to_string()],
            scope_to_project_roots: true,
            marker_file_name: ".devtools".to_string(),
            marker_linger: Duration::from_millis(150),
            diff_budget: Duration::from_secs(10),
        }
    }
}

/// Views currently suppressed from triggering outbound sync.
#[derive(Debug, Default)]
struct MutedSet {
    views: HashSet<ViewId>,
}

impl MutedSet {
    fn contains(&self, view: ViewId) -> bool {
        self.views.contains(&view)
    }

    fn insert(&mut self, view: ViewId) {
        self.views.insert(view);
    }

    fn remove(&mut self, view: ViewId) {
        self.views.remove(&view);
    }

    /// Mute `view` for the guard's lifetime; dropping unmutes.
    fn mute(&mut self, view: ViewId) -> MuteGuard<'_> {
        self.insert(view);
        MuteGuard { set: self, view }
    }
}

struct MuteGuard<'a> {
    set: &'a mut MutedSet,
    view: ViewId,
}

impl Drop for MuteGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(self.view);
    }
}

/// The sync controller. One per editor process.
pub struct SyncController<E: EditorHost> {
    editor: E,
    config: SyncConfig,
    runtime: tokio::runtime::Handle,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    socket: Option<SocketClient>,
    next_request_id: u64,
    muted: MutedSet,
    roots: ProjectRoots,
    pending_reveal: PendingReveal,
    applier: BufferApplier,
}

impl<E: EditorHost> SyncController<E> {
    /// Create the controller and open the frontend connection.
    ///
    /// The returned receiver carries transport events; the embedding
    /// adapter must drain it on the editor's serial context and feed each
    /// event to [`SyncController::dispatch`].
    pub fn new(
        editor: E,
        config: SyncConfig,
        runtime: tokio::runtime::Handle,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let applier = BufferApplier::new(config.marker_linger, config.diff_budget);
        let mut controller = Self {
            editor,
            config,
            runtime,
            events_tx,
            socket: None,
            next_request_id: 1,
            muted: MutedSet::default(),
            roots: ProjectRoots::default(),
            pending_reveal: PendingReveal::default(),
            applier,
        };
        controller.socket = Some(controller.open_socket());
        (controller, events_rx)
    }

    fn open_socket(&self) -> SocketClient {
        SocketClient::open(
            &self.config.frontend_url,
            &self.config.subprotocols,
            self.events_tx.clone(),
            &self.runtime,
        )
    }

    /// A view gained focus. Stale navigation markers go away.
    pub fn on_activated(&mut self, view: ViewId) {
        self.editor.erase_marker(view, REVEAL_MARKER);
    }

    /// A view finished loading; apply a matching deferred navigation.
    pub fn on_loaded(&mut self, view: ViewId) {
        let Some(path) = self.editor.file_path(view) else {
            return;
        };
        if let Some(line) = self.pending_reveal.take_for(&path) {
            self.reveal_line(view, line);
        }
    }

    /// A buffer changed locally. Push the full text, unless the change is
    /// the echo of a remote edit or the buffer is out of scope.
    pub fn on_modified(&mut self, view: ViewId) {
        let Some(file) = self.sync_target(view) else {
            return;
        };
        let buffer = self.editor.view_text(view);
        self.send(FrontendCommand::update_buffer(
            file.to_string_lossy(),
            buffer,
            false,
        ));
        self.editor.erase_marker(view, REVEAL_MARKER);
    }

    /// A buffer was saved. Push the full text flagged `saved`, then
    /// re-scan project roots — the save may have created a marker file.
    pub fn on_post_save(&mut self, view: ViewId) {
        if let Some(file) = self.sync_target(view) {
            let buffer = self.editor.view_text(view);
            self.send(FrontendCommand::update_buffer(
                file.to_string_lossy(),
                buffer,
                true,
            ));
        }
        self.refresh_project_roots();
    }

    /// Re-scan every window's folders for marker files, derive the root
    /// set and register it with the frontend.
    pub fn refresh_project_roots(&mut self) {
        let mut markers = Vec::new();
        for window in self.editor.windows() {
            for folder in self.editor.window_folders(window) {
                markers.extend(
                    self.editor
                        .find_marker_files(&folder, &self.config.marker_file_name),
                );
            }
        }
        self.roots.replace_from_markers(&markers);
        let paths = self
            .roots
            .paths()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.send(FrontendCommand::add_file_system(paths));
    }

    /// Feed one transport event into the state machine.
    pub fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => log::debug!("frontend link open"),
            TransportEvent::Closed { reason } => {
                log::debug!("frontend link closed ({reason}); will reconnect on next send");
                self.socket = None;
            }
            TransportEvent::Event(FrontendEvent::BufferUpdated {
                file,
                buffer,
                saved,
            }) => self.apply_buffer_updated(Path::new(&file), &buffer, saved.is_some()),
            TransportEvent::Event(FrontendEvent::RevealLocation { file, line }) => {
                self.apply_reveal_location(Path::new(&file), line)
            }
            TransportEvent::Event(FrontendEvent::Ignored) => {}
        }
    }

    /// The view's sync key, if outbound sync applies to it right now.
    fn sync_target(&self, view: ViewId) -> Option<PathBuf> {
        if self.muted.contains(view) {
            return None;
        }
        let file = self.editor.file_path(view)?;
        if self.config.scope_to_project_roots && !self.roots.contains(&file) {
            return None;
        }
        Some(file)
    }

    fn apply_buffer_updated(&mut self, file: &Path, buffer: &str, saved: bool) {
        // Every window, not just the focused one; the same file can be
        // open in several.
        for window in self.editor.windows() {
            let Some(view) = self.editor.find_open_view(window, file) else {
                continue;
            };
            let _mute = self.muted.mute(view);
            self.applier.apply(&self.editor, view, buffer);
            if saved {
                self.editor.save(view);
            }
        }
    }

    fn apply_reveal_location(&mut self, file: &Path, line: u32) {
        for window in self.editor.windows() {
            let Some(view) = self.editor.open_view(window, file) else {
                continue;
            };
            if self.editor.is_loading(view) {
                // Finish once the load-completion hook fires.
                self.pending_reveal.record(file.to_path_buf(), line);
                return;
            }
            self.reveal_line(view, line);
        }
    }

    fn reveal_line(&mut self, view: ViewId, line: u32) {
        let text = self.editor.view_text(view);
        let region = line_region(&text, line);
        self.editor.clear_selection(view);
        self.editor.select_point(view, region.end);
        self.editor.show(view, Region::empty_at(region.end));
        self.editor.add_marker(view, REVEAL_MARKER, region);
        self.editor.show(view, region);
        self.editor.focus(view);
    }

    fn send(&mut self, command: FrontendCommand) {
        if self.socket.is_none() {
            self.socket = Some(self.open_socket());
        }
        self.next_request_id += 1;
        match command.encode(self.next_request_id) {
            Ok(raw) => {
                log::debug!("→ {}", command.method());
                if let Some(socket) = &self.socket {
                    socket.post_command(raw);
                }
            }
            Err(e) => log::error!("failed to encode {}: {e}", command.method()),
        }
    }

    #[cfg(test)]
    fn buffered_commands(&self) -> Vec<String> {
        self.socket
            .as_ref()
            .map(|s| s.pending_commands())
            .unwrap_or_default()
    }
}

/// Byte region of the 0-indexed `line`, trailing terminator excluded.
/// Past-the-end lines yield an empty region at the end of the text.
fn line_region(text: &str, line: u32) -> Region {
    let mut start = 0usize;
    for _ in 0..line {
        match text[start..].find('\n') {
            Some(i) => start += i + 1,
            None => return Region::empty_at(text.len()),
        }
    }
    let rest = &text[start..];
    let mut end = start + rest.find('\n').unwrap_or(rest.len());
    if end > start && text.as_bytes()[end - 1] == b'\r' {
        end -= 1;
    }
    Region::new(start, end)
}
