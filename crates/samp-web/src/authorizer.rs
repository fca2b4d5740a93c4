//! The pluggable authorization points the Web Profile consults before a
//! `register` is allowed to reach the hub (§4.6).

use async_trait::async_trait;

/// Decides whether a page at a given `Origin` may register as a client.
/// Only the capability is required here, not a UI; real deployments
/// inject a policy that prompts the user.
#[async_trait]
pub trait ClientAuthorizer: std::fmt::Debug + Send + Sync {
    /// `origin` is the presented `Origin` header, if any.
    async fn authorize(&self, origin: Option<&str>) -> bool;
}

/// Accepts every registration unconditionally. Suitable for tests and
/// trusted local deployments, not for an internet-facing hub.
#[derive(Debug, Default)]
pub struct AllowAllAuthorizer;

#[async_trait]
impl ClientAuthorizer for AllowAllAuthorizer {
    async fn authorize(&self, _origin: Option<&str>) -> bool {
        true
    }
}

/// Delegates the accept/deny decision to an injected callback, modelling
/// a user-facing prompt ("allow example.com to connect to SAMP?") without
/// this crate owning any UI toolkit.
pub struct PromptAuthorizer {
    prompt: Box<dyn Fn(Option<&str>) -> bool + Send + Sync>,
}

impl PromptAuthorizer {
    /// Build a prompt authorizer from a synchronous decision callback.
    pub fn new(prompt: impl Fn(Option<&str>) -> bool + Send + Sync + 'static) -> Self {
        Self { prompt: Box::new(prompt) }
    }
}

impl std::fmt::Debug for PromptAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptAuthorizer").finish_non_exhaustive()
    }
}

#[async_trait]
impl ClientAuthorizer for PromptAuthorizer {
    async fn authorize(&self, origin: Option<&str>) -> bool {
        (self.prompt)(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allow_all_accepts_any_origin() {
        assert!(AllowAllAuthorizer.authorize(Some("https://example.com")).await);
        assert!(AllowAllAuthorizer.authorize(None).await);
    }

    #[tokio::test]
    async fn prompt_authorizer_delegates_to_callback() {
        let authorizer = PromptAuthorizer::new(|origin| origin == Some("https://trusted.example"));
        assert!(authorizer.authorize(Some("https://trusted.example")).await);
        assert!(!authorizer.authorize(Some("https://evil.example")).await);
    }
}
