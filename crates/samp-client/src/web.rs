//! A Web Profile client: registers with no shared secret, then polls
//! `pullCallbacks` in a background task instead of running an inbound
//! server (§4.6 — browser clients can't expose an HTTP endpoint).

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use samp_protocol::{ClientId, Message, PrivateKey, SampError, SampResult};
use samp_transport::OutboundClient;
use samp_types::SampValue;

use crate::core::Core;
use crate::handler::MessageHandler;

const METHOD_PREFIX: &str = "samp.client.";

/// Failures connecting a Web Profile client.
#[derive(Debug, Error)]
pub enum WebConnectError {
    /// The hub rejected registration (including an `OriginAuthorizer` or
    /// `ClientAuthorizer` denial surfaced as an HTTP 403).
    #[error("hub rejected registration: {0}")]
    Hub(#[from] SampError),
}

/// A connected Web Profile client: registered, with a background task
/// polling `pullCallbacks` and dispatching to a [`MessageHandler`].
#[derive(Debug)]
pub struct WebClient {
    core: Core,
    poll_shutdown: Option<oneshot::Sender<()>>,
    poll_task: JoinHandle<()>,
}

impl WebClient {
    /// The shared RPC surface (notify/call/subscriptions/...).
    pub fn core(&self) -> &Core {
        &self.core
    }

    /// Register with `hub_url` and start polling for callbacks every
    /// `poll_timeout` (the `pullCallbacks` long-poll window).
    pub async fn connect(
        hub_url: &str,
        handler: Arc<dyn MessageHandler>,
        poll_timeout: Duration,
    ) -> Result<Self, WebConnectError> {
        let outbound = OutboundClient::new(Duration::from_secs(10));

        let result = outbound.call(hub_url, "samp.hub.register", &[]).await?;
        let self_id = result
            .get("samp.self-id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SampError::TransportFailure("malformed register response".into()))?;
        let private_key = result
            .get("samp.private-key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SampError::TransportFailure("malformed register response".into()))?;

        let core = Core::new(
            outbound.clone(),
            hub_url.to_string(),
            ClientId::from_raw(self_id.to_string()),
            PrivateKey::from_presented(private_key.to_string()),
        );

        let (poll_shutdown, poll_task) = start_poll_loop(
            outbound,
            hub_url.to_string(),
            core.private_key().clone(),
            poll_timeout,
            handler,
        );

        Ok(Self {
            core,
            poll_shutdown: Some(poll_shutdown),
            poll_task,
        })
    }

    /// Unregister from the hub and stop polling.
    pub async fn disconnect(mut self) -> SampResult<()> {
        self.core.unregister().await?;
        if let Some(tx) = self.poll_shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.poll_task).await;
        Ok(())
    }
}

fn start_poll_loop(
    outbound: OutboundClient,
    hub_url: String,
    private_key: PrivateKey,
    poll_timeout: Duration,
    handler: Arc<dyn MessageHandler>,
) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let (tx, mut rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        loop {
            let pending = tokio::select! {
                _ = &mut rx => break,
                result = pull_once(&outbound, &hub_url, &private_key, poll_timeout) => result,
            };
            match pending {
                Ok(items) => {
                    for item in items {
                        dispatch_pulled(&handler, item).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "pullCallbacks failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });
    (tx, task)
}

async fn pull_once(
    outbound: &OutboundClient,
    hub_url: &str,
    private_key: &PrivateKey,
    timeout: Duration,
) -> SampResult<Vec<SampValue>> {
    let value = outbound
        .call_with_timeout(
            hub_url,
            "samp.hub.pullCallbacks",
            &[
                SampValue::string(private_key.as_str()),
                SampValue::string(format!("{:.3}", timeout.as_secs_f64())),
            ],
            Some(timeout),
        )
        .await?;
    Ok(value.as_list().cloned().unwrap_or_default())
}

async fn dispatch_pulled(handler: &Arc<dyn MessageHandler>, item: SampValue) {
    let Some(method) = item.get("samp.methodName").and_then(|v| v.as_str()) else {
        tracing::warn!("pulled callback item missing samp.methodName");
        return;
    };
    let bare = method.strip_prefix(METHOD_PREFIX).unwrap_or(method).to_string();
    let args = item
        .get("samp.params")
        .and_then(|v| v.as_list())
        .cloned()
        .unwrap_or_default();

    match bare.as_str() {
        "receiveNotification" => {
            if let (Some(sender), Some(message)) = (
                args.first().and_then(|v| v.as_str()),
                args.get(1).and_then(Message::from_samp_value),
            ) {
                handler.receive_notification(sender.to_string(), message).await;
            }
        }
        "receiveCall" => {
            if let (Some(sender), Some(msg_id), Some(message)) = (
                args.first().and_then(|v| v.as_str()),
                args.get(1).and_then(|v| v.as_str()),
                args.get(2).and_then(Message::from_samp_value),
            ) {
                handler
                    .receive_call(sender.to_string(), msg_id.to_string(), message)
                    .await;
            }
        }
        "receiveResponse" => {
            if let (Some(responder), Some(tag), Some(response)) =
                (args.first().and_then(|v| v.as_str()), args.get(1).and_then(|v| v.as_str()), args.get(2))
            {
                handler
                    .receive_response(responder.to_string(), tag.to_string(), response.clone())
                    .await;
            }
        }
        other => tracing::warn!(method = other, "unrecognised pulled callback"),
    }
}
