//! JSON wire protocol spoken with the devtools frontend.
//!
//! Every frame is a JSON object. Outbound commands carry a fresh `id`:
//! ```text
//! {"method": "Frontend.updateBuffer", "params": {...}, "id": 7}
//! ```
//! Inbound frames are notifications keyed on `method` alone; no `id`
//! correlation happens anywhere — the protocol is purely event-driven.
//!
//! Unrecognized methods and frames without a `method` field decode to
//! [`FrontendEvent::Ignored`]; they are out-of-band traffic, not errors.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Protocol-level failures. Each one is fatal to a single frame only.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Outbound command to the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendCommand {
    /// Push the full current text of a buffer; `saved` marks that the
    /// buffer was just written to disk.
    UpdateBuffer {
        file: String,
        buffer: String,
        saved: bool,
    },
    /// Register the discovered project root paths.
    AddFileSystem { paths: Vec<String> },
}

impl FrontendCommand {
    pub fn update_buffer(file: impl Into<String>, buffer: impl Into<String>, saved: bool) -> Self {
        Self::UpdateBuffer {
            file: file.into(),
            buffer: buffer.into(),
            saved,
        }
    }

    pub fn add_file_system(paths: Vec<String>) -> Self {
        Self::AddFileSystem { paths }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::UpdateBuffer { .. } => "Frontend.updateBuffer",
            Self::AddFileSystem { .. } => "Frontend.addFileSystem",
        }
    }

    fn params(&self) -> serde_json::Value {
        match self {
            Self::UpdateBuffer {
                file,
                buffer,
                saved,
            } => {
                let mut params = json!({ "file": file, "buffer": buffer });
                if *saved {
                    params["saved"] = json!(true);
                }
                params
            }
            Self::AddFileSystem { paths } => json!({ "paths": paths }),
        }
    }

    /// Serialize into the `{method, params, id}` envelope.
    pub fn encode(&self, id: u64) -> Result<String, ProtocolError> {
        let envelope = json!({
            "method": self.method(),
            "params": self.params(),
            "id": id,
        });
        serde_json::to_string(&envelope).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

/// Inbound notification from the frontend, keyed on `method`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum FrontendEvent {
    /// The frontend edited a file; apply `buffer` as the new content.
    #[serde(rename = "Frontend.bufferUpdated")]
    BufferUpdated {
        file: String,
        buffer: String,
        #[serde(default)]
        saved: Option<bool>,
    },
    /// Navigate to `line` (0-indexed) of `file`.
    #[serde(rename = "Frontend.revealLocation")]
    RevealLocation { file: String, line: u32 },
    /// Anything this core does not recognize.
    #[serde(other)]
    Ignored,
}

impl FrontendEvent {
    /// Decode one raw frame.
    ///
    /// A frame without a `method` field is out-of-band (e.g. a response
    /// object) and decodes to [`FrontendEvent::Ignored`]. Malformed JSON or
    /// malformed params for a recognized method is an error; the caller
    /// drops the frame and keeps the connection.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        // `#[serde(other)]` cannot absorb a `params` payload on an
        // adjacently tagged enum, so unknown methods are screened here.
        match value.get("method").and_then(serde_json::Value::as_str) {
            Some("Frontend.bufferUpdated") | Some("Frontend.revealLocation") => {
                serde_json::from_value(value)
                    .map_err(|e| ProtocolError::Deserialization(e.to_string()))
            }
            _ => Ok(Self::Ignored),
        }
    }
}
