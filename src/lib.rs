//! # devtools-sync — live buffer sync with a devtools frontend
//!
//! Keeps a text editor's open buffers and a browser devtools frontend's
//! virtual filesystem in step, both ways: local edits are pushed over one
//! persistent WebSocket, remote edits and navigation requests are applied
//! back to the live buffers.
//!
//! ## Architecture
//!
//! ```text
//! editor callbacks (serial context)          frontend endpoint
//! ┌──────────────────┐                      ┌──────────────────┐
//! │  SyncController   │ ── updateBuffer ──► │                  │
//! │  mute / scope /   │ ── addFileSystem ─► │  ws://…:9222/…   │
//! │  pending reveal   │ ◄─ bufferUpdated ── │                  │
//! └───────┬──────────┘ ◄─ revealLocation ─ └──────────────────┘
//!         │                    ▲
//!         ▼                    │ TransportEvent channel
//! ┌──────────────────┐  ┌──────┴───────┐
//! │  BufferApplier    │  │ SocketClient │ (reader/writer tasks)
//! │  diff + marker    │  └──────────────┘
//! └──────────────────┘
//! ```
//!
//! The controller runs entirely on the editor's serial callback context.
//! The transport's tasks never touch buffer state; they hand decoded
//! events over a channel which the embedding adapter drains back on that
//! context and feeds to [`SyncController::dispatch`].
//!
//! ## Modules
//!
//! - [`protocol`] — JSON `{method, params, id}` wire envelope
//! - [`transport`] — persistent WebSocket client with buffered outbound
//! - [`controller`] — the sync state machine (mute, scope, dispatch)
//! - [`apply`] — idempotent content application with viewport preservation
//! - [`diff`] — time-bounded minimal changed-region computation
//! - [`reveal`] — single-slot deferred navigation
//! - [`roots`] — marker-file derived project roots
//! - [`editor`] — the capability surface consumed from the host editor

pub mod apply;
pub mod controller;
pub mod diff;
pub mod editor;
pub mod protocol;
pub mod reveal;
pub mod roots;
pub mod transport;

// Re-exports for convenience
pub use apply::{BufferApplier, DIFF_MARKER};
pub use controller::{SyncConfig, SyncController, REVEAL_MARKER};
pub use diff::changed_region;
pub use editor::{EditorHost, Region, ViewId, Viewport, WindowId};
pub use protocol::{FrontendCommand, FrontendEvent, ProtocolError};
pub use reveal::PendingReveal;
pub use roots::ProjectRoots;
pub use transport::{SocketClient, TransportError, TransportEvent};
