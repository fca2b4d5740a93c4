//! Cross-origin response headers for the Web Profile's single endpoint
//! (§4.6: "CORS preflight `OPTIONS` and ordinary requests
//! independently").

/// Decides which `Origin` value, if any, to echo back in
/// `Access-Control-Allow-Origin` for a given request.
pub trait OriginAuthorizer: std::fmt::Debug + Send + Sync {
    /// Returns the origin to approve (normally the presented one, echoed
    /// back verbatim since `Access-Control-Allow-Origin` cannot carry a
    /// wildcard alongside `Access-Control-Allow-Credentials: true`), or
    /// `None` to omit CORS headers entirely.
    fn approve(&self, origin: Option<&str>) -> Option<String>;
}

/// Approves every presented origin. The primitive policy §4.6
/// requires; stricter allow-lists are a matter of implementing this trait.
#[derive(Debug, Default)]
pub struct AllowAnyOrigin;

impl OriginAuthorizer for AllowAnyOrigin {
    fn approve(&self, origin: Option<&str>) -> Option<String> {
        origin.map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_presented_origin() {
        assert_eq!(
            AllowAnyOrigin.approve(Some("https://example.com")),
            Some("https://example.com".to_string())
        );
        assert_eq!(AllowAnyOrigin.approve(None), None);
    }
}
