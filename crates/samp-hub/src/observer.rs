//! Pluggable hub observers: a single hub plus pluggable observers in
//! place of a deep inheritance hierarchy of hub-service classes. A
//! logging observer, a message-tracker-equivalent observer, or a future
//! GUI sits here instead of in a subclass.

use async_trait::async_trait;

use samp_protocol::ClientId;

/// An event a [`crate::Hub`] broadcasts to its observers. Distinct from
/// the wire-level `samp.hub.event.*` notifications: those go to
/// *subscribed clients*; these go to every attached observer regardless
/// of subscription, for in-process diagnostics (logging, metrics, a demo
/// message tracker).
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// A client completed `register`.
    ClientRegistered(ClientId),
    /// A client completed `unregister`.
    ClientUnregistered(ClientId),
    /// A client's metadata changed.
    MetadataChanged(ClientId),
    /// A client's subscriptions changed.
    SubscriptionsChanged(ClientId),
    /// A message was routed from `sender` to `recipient`.
    MessageRouted {
        /// The sending client.
        sender: ClientId,
        /// The receiving client.
        recipient: ClientId,
        /// The message's MType.
        mtype: String,
    },
    /// A Web Profile client's pending queue overflowed and it is now
    /// flagged as lagging (§4.6). Ambient diagnostics only, never a
    /// wire MType.
    ClientLagging(ClientId),
    /// The hub began its shutdown sequence.
    ShuttingDown,
}

/// An observer attached to a [`crate::Hub`] at construction time. All
/// methods have a no-op default; implement only what you need.
#[async_trait]
pub trait HubObserver: Send + Sync {
    /// Called for every [`HubEvent`] the hub emits.
    async fn on_event(&self, event: HubEvent) {
        let _ = event;
    }
}

/// A observer that logs every event via `tracing`, installed by default
/// so the hub is never silent even with no application-supplied observer.
#[derive(Debug, Default)]
pub struct LoggingObserver;

#[async_trait]
impl HubObserver for LoggingObserver {
    async fn on_event(&self, event: HubEvent) {
        match event {
            HubEvent::ClientRegistered(id) => tracing::info!(client = %id, "client registered"),
            HubEvent::ClientUnregistered(id) => tracing::info!(client = %id, "client unregistered"),
            HubEvent::MetadataChanged(id) => tracing::debug!(client = %id, "metadata updated"),
            HubEvent::SubscriptionsChanged(id) => {
                tracing::debug!(client = %id, "subscriptions updated")
            }
            HubEvent::MessageRouted { sender, recipient, mtype } => {
                tracing::debug!(%sender, %recipient, %mtype, "message routed");
            }
            HubEvent::ClientLagging(id) => {
                tracing::warn!(client = %id, "client pull-queue overflowed, marked lagging");
            }
            HubEvent::ShuttingDown => tracing::info!("hub shutting down"),
        }
    }
}
