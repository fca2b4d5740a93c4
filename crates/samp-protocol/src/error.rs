//! The hub's error taxonomy (§7), shared by every profile.

use samp_types::ValueError;

/// Result type alias for hub/protocol operations.
pub type SampResult<T> = std::result::Result<T, SampError>;

/// The hub's error taxonomy. Every public hub method fails with one of
/// these kinds; profiles translate them into their own wire fault shape
/// at the transport edge (XML-RPC fault / JSON error object).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SampError {
    /// A SAMP value failed validation before any state change occurred.
    #[error("malformed value: {0}")]
    MalformedValue(#[from] ValueError),

    /// An unknown or revoked private key was presented.
    #[error("authentication failed")]
    AuthFailure,

    /// The calling private key does not correspond to any registered client.
    #[error("unknown client")]
    UnknownClient,

    /// The named recipient/target public id has no registered client.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// The msg-id in a `reply` call does not correspond to an outstanding entry.
    #[error("unknown message id: {0}")]
    UnknownMsgId(String),

    /// The recipient of a `notify`/`call` is not subscribed to the given MType.
    #[error("recipient not subscribed to {0}")]
    NotSubscribed(String),

    /// `callAndWait` exceeded its timeout without a reply.
    #[error("call timed out")]
    Timeout,

    /// An outbound callback delivery or direct RPC failed at the transport layer.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The hub has reached a configured resource limit (e.g. max registrations).
    #[error("hub overloaded: {0}")]
    Overloaded(String),

    /// The hub is shutting down or has shut down.
    #[error("hub is shutting down")]
    HubShutdown,

    /// A remote XML-RPC fault with a numeric code (generic passthrough).
    #[error("remote failure {code}: {message}")]
    RemoteFailure {
        /// The fault code reported by the peer.
        code: i32,
        /// The fault message reported by the peer.
        message: String,
    },
}

impl SampError {
    /// The `samp.code` string used in the `{samp.errortxt, samp.code}` fault
    /// mapping (§6 "Error surface").
    pub fn samp_code(&self) -> &'static str {
        match self {
            Self::MalformedValue(_) => "samp.error.malformedvalue",
            Self::AuthFailure => "samp.error.auth",
            Self::UnknownClient => "samp.error.unknownclient",
            Self::UnknownTarget(_) => "samp.error.unknowntarget",
            Self::UnknownMsgId(_) => "samp.error.unknownmsgid",
            Self::NotSubscribed(_) => "samp.error.notsubscribed",
            Self::Timeout => "samp.error.timeout",
            Self::TransportFailure(_) => "samp.error.transport",
            Self::Overloaded(_) => "samp.error.overload",
            Self::HubShutdown => "samp.error.hubshutdown",
            Self::RemoteFailure { .. } => "samp.error.remote",
        }
    }

    /// A single generic XML-RPC fault code, per §4.3 ("a single
    /// generic code suffices").
    pub const XMLRPC_FAULT_CODE: i32 = 1;
}
