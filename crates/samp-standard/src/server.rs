//! The Standard Profile's XML-RPC loopback server (§4.5): binds a
//! random localhost port, writes the lockfile, and serves every
//! `samp.hub.*` method over XML-RPC 1.0 until stopped.

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

use samp_hub::{Hub, build_dispatcher};
use samp_protocol::{LockInfo, LockfileError, PrivateKey};
use samp_protocol::lockfile;
use samp_transport::{MethodDispatcher, RemoteFault};
use samp_transport::xmlrpc;
use samp_types::SampValue;

const METHOD_PREFIX: &str = "samp.hub.";

/// Failures starting or running the Standard Profile server.
#[derive(Debug, Error)]
pub enum StandardProfileError {
    /// Could not bind the loopback TCP listener.
    #[error("failed to bind Standard Profile listener: {0}")]
    Bind(std::io::Error),
    /// Could not write the lockfile.
    #[error("failed to write lockfile: {0}")]
    Lockfile(#[from] LockfileError),
}

/// A running Standard Profile server: the lockfile is in place, the
/// XML-RPC endpoint is accepting connections, and [`stop`](Self::stop)
/// tears both down.
#[derive(Debug)]
pub struct StandardProfileHandle {
    hub: Arc<Hub>,
    lockfile_path: PathBuf,
    base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl StandardProfileHandle {
    /// The URL clients use to reach this hub (also the lockfile's
    /// `samp.hub.xmlrpc.url`).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The lockfile path this server wrote.
    pub fn lockfile_path(&self) -> &std::path::Path {
        &self.lockfile_path
    }

    /// Stop serving, then remove the lockfile. Does not call
    /// [`Hub::shutdown`](samp_hub::Hub::shutdown); callers that own the
    /// hub broadcast that first so in-flight calls still see it.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.server.await;
        if let Err(err) = std::fs::remove_file(&self.lockfile_path) {
            tracing::warn!(path = %self.lockfile_path.display(), %err, "failed to remove lockfile");
        }
    }
}

/// Entry point for the Standard Profile (§4.5).
#[derive(Debug)]
pub struct StandardProfile;

impl StandardProfile {
    /// Start serving `hub` over the Standard Profile: bind a random
    /// loopback port, register `register`/`declareCallback` alongside the
    /// shared dispatch table, and write the lockfile at `lockfile_path`
    /// (defaulting to [`lockfile::default_path`]).
    pub async fn start(
        hub: Arc<Hub>,
        lockfile_path: Option<PathBuf>,
    ) -> Result<StandardProfileHandle, StandardProfileError> {
        let secret = PrivateKey::generate();

        let addr: SocketAddr = "127.0.0.1:0".parse().expect("static address parses");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(StandardProfileError::Bind)?;
        let port = listener
            .local_addr()
            .map_err(StandardProfileError::Bind)?
            .port();

        let host = hub
            .config()
            .localhost_override
            .as_ref()
            .map(|o| o.resolve())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let base_url = format!("http://{host}:{port}/");

        let mut dispatcher = build_dispatcher(hub.clone());
        register_profile_methods(&mut dispatcher, hub.clone(), secret.clone());

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };
        let app = Router::new().route("/", post(handle_xmlrpc)).with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::error!(%err, "Standard Profile server exited with an error");
            }
        });

        let lockfile_path = lockfile_path.unwrap_or_else(lockfile::default_path);
        let mut info = LockInfo::new();
        info.set(lockfile::KEY_SECRET, secret.as_str());
        info.set(lockfile::KEY_HUB_XMLRPC_URL, base_url.clone());
        info.set(lockfile::KEY_PROFILE_VERSION, "1.0");
        lockfile::write_atomic(&lockfile_path, &info)?;
        tracing::info!(path = %lockfile_path.display(), url = %base_url, "Standard Profile listening");

        Ok(StandardProfileHandle {
            hub,
            lockfile_path,
            base_url,
            shutdown_tx: Some(shutdown_tx),
            server,
        })
    }
}

/// `register` and `declareCallback` (§4.5): the only two methods
/// that differ by profile, so they're bound directly instead of going
/// through [`build_dispatcher`].
fn register_profile_methods(dispatcher: &mut MethodDispatcher, hub: Arc<Hub>, secret: PrivateKey) {
    use samp_protocol::SampError;
    use samp_transport::dispatch::handler;

    {
        let hub = hub.clone();
        let secret = secret.clone();
        dispatcher.register(
            "register",
            handler(move |args| {
                let hub = hub.clone();
                let secret = secret.clone();
                async move {
                    let presented = args
                        .first()
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| SampError::MalformedValue(samp_types::ValueError::MalformedValue {
                            reason: "missing secret argument".into(),
                            path: "root".into(),
                        }))?;
                    if PrivateKey::from_presented(presented.to_string()) != secret {
                        return Err(SampError::AuthFailure);
                    }
                    let outcome = hub.register().await?;
                    let mut result = SampValue::map();
                    result.insert("samp.hub-id", SampValue::string(outcome.hub_id.to_string()));
                    result.insert("samp.self-id", SampValue::string(outcome.self_id.to_string()));
                    result.insert("samp.private-key", SampValue::string(outcome.private_key.as_str()));
                    Ok(result)
                }
            }),
        );
    }
    {
        dispatcher.register(
            "declareCallback",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = args
                        .first()
                        .and_then(|v| v.as_str())
                        .map(|s| PrivateKey::from_presented(s.to_string()))
                        .ok_or(SampError::UnknownClient)?;
                    let url = args
                        .get(1)
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| SampError::MalformedValue(samp_types::ValueError::MalformedValue {
                            reason: "missing callback URL argument".into(),
                            path: "root".into(),
                        }))?
                        .to_string();
                    hub.declare_callback(&key, url).await?;
                    Ok(SampValue::map())
                }
            }),
        );
    }
}

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<MethodDispatcher>,
}

async fn handle_xmlrpc(State(state): State<AppState>, body: String) -> String {
    let (method, args) = match xmlrpc::decode_method_call(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            let fault = RemoteFault {
                code: samp_protocol::SampError::XMLRPC_FAULT_CODE,
                message: format!("malformed XML-RPC request: {err}"),
                samp_code: "samp.error.malformed",
            };
            return xmlrpc::encode_method_response_fault(&fault);
        }
    };
    let bare = method.strip_prefix(METHOD_PREFIX).unwrap_or(&method);

    match state.dispatcher.dispatch(bare, args).await {
        Ok(value) => xmlrpc::encode_method_response_success(&value),
        Err(err) => xmlrpc::encode_method_response_fault(&RemoteFault::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samp_protocol::HubConfig;
    use samp_transport::xmlrpc::MethodResponse;

    #[tokio::test]
    async fn starts_writes_lockfile_and_serves_register() {
        let dir = tempfile::tempdir().unwrap();
        let lockfile_path = dir.path().join(".samp");

        let hub = Hub::new(HubConfig::new());
        let handle = StandardProfile::start(hub.clone(), Some(lockfile_path.clone()))
            .await
            .unwrap();

        let info = lockfile::read(&lockfile_path).unwrap();
        info.validate().unwrap();
        let secret = info.get(lockfile::KEY_SECRET).unwrap().to_string();
        assert_eq!(info.get(lockfile::KEY_HUB_XMLRPC_URL).unwrap(), handle.base_url());

        let client = reqwest::Client::new();
        let body = xmlrpc::encode_method_call("samp.hub.register", &[SampValue::string(secret)]);
        let resp = client
            .post(handle.base_url())
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await
            .unwrap();
        let text = resp.text().await.unwrap();
        match xmlrpc::decode_method_response(&text).unwrap() {
            MethodResponse::Success(value) => {
                assert!(value.get("samp.private-key").is_some());
            }
            MethodResponse::Fault(f) => panic!("unexpected fault: {}", f.message),
        }

        handle.stop().await;
        assert!(!lockfile_path.exists());
    }

    #[tokio::test]
    async fn rejects_register_with_wrong_secret() {
        let dir = tempfile::tempdir().unwrap();
        let lockfile_path = dir.path().join(".samp");
        let hub = Hub::new(HubConfig::new());
        let handle = StandardProfile::start(hub, Some(lockfile_path)).await.unwrap();

        let client = reqwest::Client::new();
        let body = xmlrpc::encode_method_call("samp.hub.register", &[SampValue::string("wrong")]);
        let resp = client
            .post(handle.base_url())
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await
            .unwrap();
        let text = resp.text().await.unwrap();
        match xmlrpc::decode_method_response(&text).unwrap() {
            MethodResponse::Fault(f) => assert_eq!(f.samp_code, "samp.error.auth"),
            MethodResponse::Success(_) => panic!("expected an auth fault"),
        }

        handle.stop().await;
    }
}
