//! The inbound half of a client: callbacks the hub delivers
//! (`samp.client.*`), handed to user code via a pluggable trait (mirrors
//! `samp_hub::observer::HubObserver`'s pluggable-sink shape on the other
//! side of the wire).

use async_trait::async_trait;

use samp_protocol::Message;
use samp_types::SampValue;

/// Callbacks a registered client may receive. Every method defaults to a
/// no-op so implementors only override what they use.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// `receiveNotification`: a fire-and-forget message from `sender_id`.
    async fn receive_notification(&self, sender_id: String, message: Message) {
        let _ = (sender_id, message);
    }

    /// `receiveCall`: a message expecting a `reply(msg_id, ...)`.
    async fn receive_call(&self, sender_id: String, msg_id: String, message: Message) {
        let _ = (sender_id, msg_id, message);
    }

    /// `receiveResponse`: the result of a prior `call`/`callAll`.
    async fn receive_response(&self, responder_id: String, tag: String, response: SampValue) {
        let _ = (responder_id, tag, response);
    }
}

/// A handler that ignores every callback, for clients that only ever
/// send.
#[derive(Debug, Default)]
pub struct NoopHandler;

impl MessageHandler for NoopHandler {}
