//! A Standard Profile client: discovers the hub via the lockfile, then
//! runs its own tiny XML-RPC loopback server for `samp.client.*`
//! callbacks, the mirror image of `samp-standard`'s hub-side server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use samp_protocol::{lockfile, LockfileError, Message, PrivateKey, SampError, SampResult};
use samp_transport::{OutboundClient, RemoteFault};
use samp_transport::xmlrpc;
use samp_types::SampValue;

use crate::core::Core;
use crate::handler::MessageHandler;

const METHOD_PREFIX: &str = "samp.client.";

/// Failures connecting a Standard Profile client.
#[derive(Debug, Error)]
pub enum StandardConnectError {
    /// Couldn't read or validate the lockfile.
    #[error("lockfile error: {0}")]
    Lockfile(#[from] LockfileError),
    /// The lockfile was missing a required key.
    #[error("incomplete lockfile: {0}")]
    Incomplete(String),
    /// Couldn't bind the client's own callback listener.
    #[error("failed to bind callback listener: {0}")]
    Bind(std::io::Error),
    /// The hub rejected registration or a setup call.
    #[error("hub rejected registration: {0}")]
    Hub(#[from] SampError),
}

/// A connected Standard Profile client: registered, with its own
/// callback server running and declared to the hub.
#[derive(Debug)]
pub struct StandardClient {
    core: Core,
    callback_shutdown: Option<oneshot::Sender<()>>,
    callback_server: JoinHandle<()>,
}

impl StandardClient {
    /// The shared RPC surface (notify/call/subscriptions/...).
    pub fn core(&self) -> &Core {
        &self.core
    }

    /// Connect via the default lockfile path (`$HOME/.samp`), or an
    /// explicit override.
    pub async fn connect(
        lockfile_path: Option<PathBuf>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, StandardConnectError> {
        let path = lockfile_path.unwrap_or_else(lockfile::default_path);
        let info = lockfile::read(&path)?;
        info.validate()?;
        let secret = info
            .get(lockfile::KEY_SECRET)
            .ok_or_else(|| StandardConnectError::Incomplete(lockfile::KEY_SECRET.to_string()))?
            .to_string();
        let hub_url = info
            .get(lockfile::KEY_HUB_XMLRPC_URL)
            .ok_or_else(|| StandardConnectError::Incomplete(lockfile::KEY_HUB_XMLRPC_URL.to_string()))?
            .to_string();

        Self::connect_to(&hub_url, &secret, handler).await
    }

    /// Connect directly to a known hub URL, bypassing the lockfile (used
    /// by tests and by deployments with an external discovery mechanism).
    pub async fn connect_to(
        hub_url: &str,
        secret: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, StandardConnectError> {
        let outbound = OutboundClient::new(std::time::Duration::from_secs(10));

        let result = outbound
            .call(hub_url, "samp.hub.register", &[SampValue::string(secret)])
            .await?;
        let self_id = result
            .get("samp.self-id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SampError::TransportFailure("malformed register response".into()))?;
        let private_key = result
            .get("samp.private-key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SampError::TransportFailure("malformed register response".into()))?;

        let core = Core::new(
            outbound,
            hub_url.to_string(),
            samp_protocol::ClientId::from_raw(self_id.to_string()),
            PrivateKey::from_presented(private_key.to_string()),
        );

        let (callback_shutdown, callback_server, callback_url) =
            start_callback_server(handler).await.map_err(StandardConnectError::Bind)?;

        let standard_outbound = OutboundClient::new(std::time::Duration::from_secs(10));
        standard_outbound
            .call(
                hub_url,
                "samp.hub.declareCallback",
                &[SampValue::string(core.private_key().as_str()), SampValue::string(callback_url)],
            )
            .await?;

        Ok(Self {
            core,
            callback_shutdown: Some(callback_shutdown),
            callback_server,
        })
    }

    /// Unregister from the hub and stop the callback server.
    pub async fn disconnect(mut self) -> SampResult<()> {
        self.core.unregister().await?;
        if let Some(tx) = self.callback_shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.callback_server).await;
        Ok(())
    }
}

async fn start_callback_server(
    handler: Arc<dyn MessageHandler>,
) -> Result<(oneshot::Sender<()>, JoinHandle<()>, String), std::io::Error> {
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("static address parses");
    let listener = TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();
    let url = format!("http://127.0.0.1:{port}/");

    let state = CallbackState { handler };
    let app = Router::new().route("/", post(handle_callback)).with_state(state);

    let (tx, rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await;
        if let Err(err) = result {
            tracing::error!(%err, "client callback server exited with an error");
        }
    });

    Ok((tx, server, url))
}

#[derive(Clone)]
struct CallbackState {
    handler: Arc<dyn MessageHandler>,
}

async fn handle_callback(State(state): State<CallbackState>, body: String) -> String {
    let (method, args) = match xmlrpc::decode_method_call(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            let fault = RemoteFault {
                code: SampError::XMLRPC_FAULT_CODE,
                message: format!("malformed XML-RPC callback: {err}"),
                samp_code: "samp.error.malformed",
            };
            return xmlrpc::encode_method_response_fault(&fault);
        }
    };
    let bare = method.strip_prefix(METHOD_PREFIX).unwrap_or(&method);
    dispatch_callback(&state.handler, bare, args).await;
    xmlrpc::encode_method_response_success(&SampValue::map())
}

async fn dispatch_callback(handler: &Arc<dyn MessageHandler>, method: &str, args: Vec<SampValue>) {
    match method {
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
        other => tracing::warn!(method = other, "unrecognised client callback"),
    }
}
