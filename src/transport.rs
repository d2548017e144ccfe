//! Persistent WebSocket link to the devtools frontend.
//!
//! One [`SocketClient`] owns one logical connection. Commands posted while
//! the link is down are buffered in order and flushed the moment the
//! handshake completes; decoded inbound frames are forwarded over an
//! unbounded channel so the owner can drain them from its own serial
//! context (buffer state is never touched from the receive task).
//!
//! Connection loss is healed lazily: the reader task marks the client
//! closed and emits [`TransportEvent::Closed`], the owner drops its
//! reference, and the next outbound send constructs a fresh client. No
//! backoff, no keepalive — the endpoint is a co-located debugging host.
//!
//! The pending queue is unbounded on purpose: volume is bounded by human
//! edit rate, and a hung endpoint accumulating commands is an accepted
//! limitation rather than something to paper over with backpressure.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{InvalidHeaderValue, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::FrontendEvent;

/// Transport-side failures. All of them degrade silently at the sync
/// layer; they exist for logging and tests.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid sub-protocol header: {0}")]
    SubProtocol(#[from] InvalidHeaderValue),
}

/// Events marshalled from the connection tasks to the owner's serial
/// context.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake completed; buffered commands were flushed.
    Opened,
    /// A decoded inbound notification.
    Event(FrontendEvent),
    /// The connection is gone. The owner should drop its client reference
    /// so the next send creates a fresh one.
    Closed { reason: String },
}

struct ChannelState {
    opened: bool,
    pending: VecDeque<String>,
    writer: Option<mpsc::UnboundedSender<String>>,
}

/// Client half of the frontend connection.
pub struct SocketClient {
    state: Arc<Mutex<ChannelState>>,
}

impl SocketClient {
    /// Start connecting and return immediately. Commands posted before the
    /// handshake completes are buffered and flushed in FIFO order once it
    /// does.
    pub fn open(
        url: &str,
        subprotocols: &[String],
        events: mpsc::UnboundedSender<TransportEvent>,
        runtime: &tokio::runtime::Handle,
    ) -> Self {
        let state = Arc::new(Mutex::new(ChannelState {
            opened: false,
            pending: VecDeque::new(),
            writer: None,
        }));
        runtime.spawn(run_connection(
            Arc::clone(&state),
            url.to_string(),
            subprotocols.to_vec(),
            events,
        ));
        Self { state }
    }

    /// Send a serialized command now, or buffer it until the link opens.
    /// Never blocks and never fails; a command posted to a link that dies
    /// before flushing is lost with the connection.
    pub fn post_command(&self, raw: String) {
        let mut state = lock(&self.state);
        if state.opened {
            if let Some(writer) = state.writer.clone() {
                if let Err(returned) = writer.send(raw) {
                    // Writer task is gone; the close notification is on its
                    // way. Hold the command until then.
                    state.pending.push_back(returned.0);
                }
                return;
            }
        }
        state.pending.push_back(raw);
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).opened
    }

    /// Commands buffered while disconnected, oldest first. Diagnostics.
    pub fn pending_commands(&self) -> Vec<String> {
        lock(&self.state).pending.iter().cloned().collect()
    }
}

fn lock(state: &Arc<Mutex<ChannelState>>) -> MutexGuard<'_, ChannelState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_request(
    url: &str,
    subprotocols: &[String],
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, TransportError> {
    let mut request = url.into_client_request()?;
    if !subprotocols.is_empty() {
        let value = HeaderValue::from_str(&subprotocols.join(", "))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }
    Ok(request)
}

async fn run_connection(
    state: Arc<Mutex<ChannelState>>,
    url: String,
    subprotocols: Vec<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let request = match build_request(&url, &subprotocols) {
        Ok(request) => request,
        Err(e) => {
            log::error!("bad frontend request for {url}: {e}");
            let _ = events.send(TransportEvent::Closed {
                reason: e.to_string(),
            });
            return;
        }
    };

    let (stream, response) = match tokio_tungstenite::connect_async(request).await {
        Ok(connected) => connected,
        Err(e) => {
            log::info!("frontend connect to {url} failed: {e}");
            let _ = events.send(TransportEvent::Closed {
                reason: e.to_string(),
            });
            return;
        }
    };
    log::info!(
        "frontend connection opened ({} sub-protocol)",
        response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("no"),
    );

    let (mut ws_writer, mut ws_reader) = stream.split();

    // Writer task: forward the outgoing channel onto the socket.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(raw) = out_rx.recv().await {
            if ws_writer.send(Message::Text(raw.into())).await.is_err() {
                break;
            }
        }
    });

    // Open and flush atomically so nothing can jump the buffered queue.
    {
        let mut state = lock(&state);
        state.opened = true;
        let flushed = state.pending.len();
        while let Some(raw) = state.pending.pop_front() {
            let _ = out_tx.send(raw);
        }
        if flushed > 0 {
            log::info!("flushed {flushed} buffered commands");
        }
        state.writer = Some(out_tx);
    }
    let _ = events.send(TransportEvent::Opened);

    let mut close_reason = String::from("connection closed");
    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Text(raw)) => match FrontendEvent::decode(raw.as_str()) {
                Ok(event) => {
                    let _ = events.send(TransportEvent::Event(event));
                }
                // Fatal to this frame only; the connection stays up.
                Err(e) => log::warn!("dropping malformed frontend frame: {e}"),
            },
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    close_reason = format!("close frame {}: {}", u16::from(frame.code), frame.reason);
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                close_reason = e.to_string();
                break;
            }
        }
    }

    {
        let mut state = lock(&state);
        state.opened = false;
        state.writer = None;
    }
    log::info!("frontend connection closed: {close_reason}");
    let _ = events.send(TransportEvent::Closed {
        reason: close_reason,
    });
}
