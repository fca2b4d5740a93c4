//! The Web Profile's single HTTP endpoint (§4.6): one URL serves
//! every Web client, gated by a pluggable [`ClientAuthorizer`] on
//! `register` and an [`OriginAuthorizer`] for CORS.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use samp_hub::{Hub, build_dispatcher};
use samp_protocol::{PrivateKey, SampError};
use samp_transport::{MethodDispatcher, RemoteFault};
use samp_transport::xmlrpc;
use samp_types::{SampValue, ValueError};

use crate::authorizer::ClientAuthorizer;
use crate::origin::OriginAuthorizer;

const METHOD_PREFIX: &str = "samp.hub.";
const DEFAULT_PULL_TIMEOUT_SECS: f64 = 0.0;

/// Failures starting the Web Profile server.
#[derive(Debug, Error)]
pub enum WebProfileError {
    /// Could not bind the requested TCP listener.
    #[error("failed to bind Web Profile listener: {0}")]
    Bind(std::io::Error),
}

/// A running Web Profile server.
#[derive(Debug)]
pub struct WebProfileHandle {
    base_url: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl WebProfileHandle {
    /// The single URL every Web client connects to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop serving.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.server.await;
    }
}

/// Entry point for the Web Profile (§4.6).
#[derive(Debug)]
pub struct WebProfile;

impl WebProfile {
    /// Start serving `hub` over the Web Profile on `addr` (use port 0 to
    /// let the OS choose), gated by `client_authorizer` and
    /// `origin_authorizer`.
    pub async fn start(
        hub: Arc<Hub>,
        addr: SocketAddr,
        client_authorizer: Arc<dyn ClientAuthorizer>,
        origin_authorizer: Arc<dyn OriginAuthorizer>,
    ) -> Result<WebProfileHandle, WebProfileError> {
        let listener = TcpListener::bind(addr).await.map_err(WebProfileError::Bind)?;
        let local_addr = listener.local_addr().map_err(WebProfileError::Bind)?;
        let base_url = format!("http://{local_addr}/");

        let dispatcher = Arc::new(build_dispatcher(hub.clone()));
        let state = AppState {
            hub,
            dispatcher,
            client_authorizer,
            origin_authorizer,
        };

        let app = Router::new()
            .route("/", post(handle_request).fallback(handle_other_method))
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::error!(%err, "Web Profile server exited with an error");
            }
        });

        tracing::info!(url = %base_url, "Web Profile listening");
        Ok(WebProfileHandle {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            server,
        })
    }
}

#[derive(Clone)]
struct AppState {
    hub: Arc<Hub>,
    dispatcher: Arc<MethodDispatcher>,
    client_authorizer: Arc<dyn ClientAuthorizer>,
    origin_authorizer: Arc<dyn OriginAuthorizer>,
}

fn cors_headers(origin_authorizer: &dyn OriginAuthorizer, origin: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(approved) = origin_authorizer.approve(origin) {
        if let Ok(value) = HeaderValue::from_str(&approved) {
            headers.insert(HeaderName::from_static("access-control-allow-origin"), value);
            headers.insert(
                HeaderName::from_static("access-control-allow-credentials"),
                HeaderValue::from_static("true"),
            );
        }
    }
    headers
}

fn xml_response(status: StatusCode, cors: HeaderMap, body: String) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().extend(cors);
    response
        .headers_mut()
        .insert(axum::http::header::CONTENT_TYPE, HeaderValue::from_static("text/xml"));
    response
}

/// Handles CORS preflight (`OPTIONS`) and any method other than `POST`
/// against the single endpoint.
async fn handle_other_method(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let origin = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok());
    let mut cors = cors_headers(state.origin_authorizer.as_ref(), origin);
    cors.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("POST, OPTIONS"),
    );
    cors.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("Content-Type"),
    );
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().extend(cors);
    response
}

async fn handle_request(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let origin = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok());
    let cors = cors_headers(state.origin_authorizer.as_ref(), origin);

    let (method, args) = match xmlrpc::decode_method_call(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            let fault = RemoteFault {
                code: SampError::XMLRPC_FAULT_CODE,
                message: format!("malformed XML-RPC request: {err}"),
                samp_code: "samp.error.malformed",
            };
            return xml_response(StatusCode::OK, cors, xmlrpc::encode_method_response_fault(&fault));
        }
    };
    let bare = method.strip_prefix(METHOD_PREFIX).unwrap_or(&method);

    let result = match bare {
        "register" => handle_register(&state, origin).await,
        "pullCallbacks" => handle_pull_callbacks(&state, &args).await,
        _ => state.dispatcher.dispatch(bare, args).await,
    };

    match result {
        Ok(value) => xml_response(StatusCode::OK, cors, xmlrpc::encode_method_response_success(&value)),
        Err(SampError::AuthFailure) if bare == "register" => {
            // Spec §4.6: a rejected registration is an HTTP 403, not an
            // XML-RPC fault.
            xml_response(StatusCode::FORBIDDEN, cors, String::new())
        }
        Err(err) => xml_response(StatusCode::OK, cors, xmlrpc::encode_method_response_fault(&RemoteFault::from_error(&err))),
    }
}

async fn handle_register(state: &AppState, origin: Option<&str>) -> samp_protocol::SampResult<SampValue> {
    if !state.client_authorizer.authorize(origin).await {
        return Err(SampError::AuthFailure);
    }
    let outcome = state.hub.register_web().await?;
    let mut result = SampValue::map();
    result.insert("samp.hub-id", SampValue::string(outcome.hub_id.to_string()));
    result.insert("samp.self-id", SampValue::string(outcome.self_id.to_string()));
    result.insert("samp.private-key", SampValue::string(outcome.private_key.as_str()));
    Ok(result)
}

async fn handle_pull_callbacks(state: &AppState, args: &[SampValue]) -> samp_protocol::SampResult<SampValue> {
    let key = args
        .first()
        .and_then(|v| v.as_str())
        .map(|s| PrivateKey::from_presented(s.to_string()))
        .ok_or(SampError::UnknownClient)?;
    let timeout_secs: f64 = match args.get(1).and_then(|v| v.as_str()) {
        Some(s) => s
            .parse()
            .map_err(|_| SampError::MalformedValue(ValueError::MalformedValue {
                reason: "timeout must be a decimal number of seconds".into(),
                path: "root".into(),
            }))?,
        None => DEFAULT_PULL_TIMEOUT_SECS,
    };
    let timeout = if timeout_secs <= 0.0 {
        Duration::from_secs(600)
    } else {
        Duration::from_secs_f64(timeout_secs)
    };
    let items = state.hub.pull_callbacks(&key, timeout).await?;
    Ok(SampValue::list(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use samp_protocol::HubConfig;
    use samp_transport::xmlrpc::MethodResponse;

    use crate::authorizer::AllowAllAuthorizer;
    use crate::origin::AllowAnyOrigin;

    async fn start_test_server(hub: Arc<Hub>) -> WebProfileHandle {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        WebProfile::start(hub, addr, Arc::new(AllowAllAuthorizer), Arc::new(AllowAnyOrigin))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn registers_over_the_single_endpoint() {
        let hub = Hub::new(HubConfig::new());
        let handle = start_test_server(hub).await;

        let client = reqwest::Client::new();
        let body = xmlrpc::encode_method_call("samp.hub.register", &[]);
        let resp = client
            .post(handle.base_url())
            .header("Origin", "https://example.com")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://example.com"
        );
        let text = resp.text().await.unwrap();
        match xmlrpc::decode_method_response(&text).unwrap() {
            MethodResponse::Success(value) => {
                let key = value.get("samp.private-key").unwrap().as_str().unwrap();
                assert!(key.starts_with("wk:"));
            }
            MethodResponse::Fault(f) => panic!("unexpected fault: {}", f.message),
        }
        handle.stop().await;
    }

    #[tokio::test]
    async fn rejected_registration_is_http_403() {
        let hub = Hub::new(HubConfig::new());
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let deny = Arc::new(crate::authorizer::PromptAuthorizer::new(|_| false));
        let handle = WebProfile::start(hub, addr, deny, Arc::new(AllowAnyOrigin)).await.unwrap();

        let client = reqwest::Client::new();
        let body = xmlrpc::encode_method_call("samp.hub.register", &[]);
        let resp = client.post(handle.base_url()).body(body).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        handle.stop().await;
    }

    #[tokio::test]
    async fn pull_callbacks_times_out_with_an_empty_list() {
        let hub = Hub::new(HubConfig::new());
        let handle = start_test_server(hub.clone()).await;
        let outcome = hub.register_web().await.unwrap();

        let client = reqwest::Client::new();
        let body = xmlrpc::encode_method_call(
            "samp.hub.pullCallbacks",
            &[SampValue::string(outcome.private_key.as_str()), SampValue::string("0.05")],
        );
        let resp = client.post(handle.base_url()).body(body).send().await.unwrap();
        let text = resp.text().await.unwrap();
        match xmlrpc::decode_method_response(&text).unwrap() {
            MethodResponse::Success(value) => assert_eq!(value.as_list().unwrap().len(), 0),
            MethodResponse::Fault(f) => panic!("unexpected fault: {}", f.message),
        }
        handle.stop().await;
    }
}
