use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::DispatchError;


/// An event received from a peer.
///
/// The representation matches the wire format consumed by relay servers:
/// a `type` tag plus camelCase keys, with dispatch arguments carried as a
/// JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// `{"type":"requestUpdate","state":...}` — asks for a full snapshot of
    /// one state.
    RequestUpdate { state: String },
    /// `{"type":"dispatch","state":...,"dispatcher":...,"args":[...]}` —
    /// invokes a named dispatcher. Arguments are trusted beyond tuple-shape
    /// validation at the boundary.
    Dispatch {
        state: String,
        dispatcher: String,
        args: Vec<Value>,
    },
}

/// An event sent to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Broadcast on any state change, and the direct reply to
    /// [`ClientEvent::RequestUpdate`].
    #[serde(rename_all = "camelCase")]
    StateUpdate { state_name: String, new_state: Value },
}

/// Failures at the wire boundary. Relays log these and drop the event; they
/// never cross back into a peer's event loop.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("state `{state}` cannot be serialized: {source}")]
    Snapshot {
        state: String,
        source: serde_json::Error,
    },
}
