//! Call tracking (§3 "Call tracking entry", §4.4 "call"/"callAndWait").
//!
//! Each outstanding `call` gets an entry keyed by msg-id. `callAndWait`
//! additionally parks its caller on a one-shot completion channel stored
//! in the same entry, so `reply` only has one place to look.

use dashmap::DashMap;
use tokio::sync::oneshot;

use samp_protocol::ClientId;
use samp_types::SampValue;

/// A msg-id: a fresh random token, opaque to clients (§4.4: "Hub
/// mints a msg-id encoding both a fresh random token and (opaquely) the
/// sender id and tag" -- the sender/tag correlation lives in the tracking
/// table, not in the string itself, which keeps the wire value truly
/// opaque).
pub type MsgId = String;

/// An outstanding `call`/`callAndWait` awaiting a reply (§3).
pub struct CallTrackingEntry {
    /// The client that issued the call.
    pub sender: ClientId,
    /// The client the call was sent to.
    pub recipient: ClientId,
    /// The caller-supplied correlation tag, echoed back via
    /// `receiveResponse`.
    pub tag: String,
    /// Present only for `callAndWait`: fulfilling this delivers the
    /// response straight to the blocked caller instead of going through
    /// an async `receiveResponse` callback.
    pub waiter: Option<oneshot::Sender<SampValue>>,
}

impl std::fmt::Debug for CallTrackingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallTrackingEntry")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("tag", &self.tag)
            .field("is_call_and_wait", &self.waiter.is_some())
            .finish()
    }
}

/// The msg-id -> tracking-entry table. One per hub.
#[derive(Debug, Default)]
pub struct TrackingTable {
    entries: DashMap<MsgId, CallTrackingEntry>,
}

impl TrackingTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new outstanding call.
    pub fn insert(&self, msg_id: MsgId, entry: CallTrackingEntry) {
        self.entries.insert(msg_id, entry);
    }

    /// Remove and return an entry, e.g. on reply, timeout, or unregistration.
    pub fn remove(&self, msg_id: &str) -> Option<CallTrackingEntry> {
        self.entries.remove(msg_id).map(|(_, v)| v)
    }

    /// Whether an entry is still outstanding.
    pub fn contains(&self, msg_id: &str) -> bool {
        self.entries.contains_key(msg_id)
    }

    /// Remove and return every entry where `client` is the sender or the
    /// recipient (§4.4 "Unregistration ... (i) deletion of all
    /// tracking entries where X is sender or recipient").
    pub fn remove_involving(&self, client: &ClientId) -> Vec<(MsgId, CallTrackingEntry)> {
        let ids: Vec<MsgId> = self
            .entries
            .iter()
            .filter(|e| &e.sender == client || &e.recipient == client)
            .map(|e| e.key().clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|(k, v)| (k, v)))
            .collect()
    }

    /// Number of outstanding calls, for diagnostics/tests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
