//! The inbound half of the adapter (§4.3): a handler map from method
//! name to an async SAMP-value-in, SAMP-value-out function, populated once
//! at server construction (§9: "replace dynamic reflective dispatch
//! with an explicit method dispatch table").

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use samp_protocol::SampResult;
use samp_types::SampValue;

/// A boxed, cloneable inbound method handler.
pub type HandlerFn =
    Arc<dyn Fn(Vec<SampValue>) -> BoxFuture<'static, SampResult<SampValue>> + Send + Sync>;

/// The method-name -> handler table a profile dispatches inbound calls
/// through. Both the Standard Profile's XML-RPC server and the Web
/// Profile's single HTTP endpoint hold one of these, built once from the
/// same set of hub operations.
#[derive(Clone, Default)]
pub struct MethodDispatcher {
    handlers: HashMap<String, HandlerFn>,
}

impl std::fmt::Debug for MethodDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDispatcher")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MethodDispatcher {
    /// An empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a bare method name (without the
    /// `samp.hub.`/`samp.webhub.` prefix the wire uses; profiles add and
    /// strip their own prefix before looking up here).
    pub fn register(&mut self, name: impl Into<String>, handler: HandlerFn) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Look up and invoke a handler by bare method name.
    pub async fn dispatch(&self, method: &str, args: Vec<SampValue>) -> SampResult<SampValue> {
        match self.handlers.get(method) {
            Some(handler) => handler(args).await,
            None => Err(samp_protocol::SampError::TransportFailure(format!(
                "no such method: {method}"
            ))),
        }
    }

    /// The set of registered bare method names, for diagnostics/capability
    /// introspection.
    pub fn method_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

/// Helper to build a [`HandlerFn`] from an `async fn(Vec<SampValue>) ->
/// SampResult<SampValue>`-shaped closure without repeating the boxing
/// boilerplate at every call site.
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Vec<SampValue>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = SampResult<SampValue>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use samp_protocol::SampError;

    #[tokio::test]
    async fn dispatches_registered_method() {
        let mut d = MethodDispatcher::new();
        d.register(
            "ping",
            handler(|_args| async { Ok(SampValue::string("pong")) }),
        );
        let result = d.dispatch("ping", vec![]).await.unwrap();
        assert_eq!(result.as_str(), Some("pong"));
    }

    #[tokio::test]
    async fn unknown_method_is_transport_failure() {
        let d = MethodDispatcher::new();
        let err = d.dispatch("nope", vec![]).await.unwrap_err();
        assert!(matches!(err, SampError::TransportFailure(_)));
    }
}
