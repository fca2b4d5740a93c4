//! The outbound half of the adapter (§4.3): a `call(endpoint, method,
//! args)` primitive used to push `samp.client.*` callbacks to Standard
//! Profile clients. Failures are reported as [`SampError::TransportFailure`]
//! so the caller can apply the "log and swallow" policy of §4.4.

use std::time::Duration;

use samp_protocol::{SampError, SampResult};
use samp_types::SampValue;

use crate::xmlrpc::{self, MethodResponse};

/// An outbound XML-RPC client used to deliver `samp.client.*` callbacks to
/// a Standard Profile client's declared callback URL.
#[derive(Debug, Clone)]
pub struct OutboundClient {
    http: reqwest::Client,
}

impl OutboundClient {
    /// Build a client with the given connect/read timeout (§5 default
    /// 10s).
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with a valid timeout");
        Self { http }
    }

    /// POST an XML-RPC `methodCall` for `method(args...)` to `endpoint` and
    /// decode the response, using this client's default timeout.
    pub async fn call(
        &self,
        endpoint: &str,
        method: &str,
        args: &[SampValue],
    ) -> SampResult<SampValue> {
        self.call_with_timeout(endpoint, method, args, None).await
    }

    /// Like [`Self::call`], but overriding the request's timeout — needed
    /// for `callAndWait`/`pullCallbacks`, whose caller-supplied wait can
    /// exceed this client's default connect/read timeout (§5: these
    /// two methods plus outbound callback sends are the only calls allowed
    /// to block beyond RPC parsing, each on its own bound).
    pub async fn call_with_timeout(
        &self,
        endpoint: &str,
        method: &str,
        args: &[SampValue],
        timeout: Option<Duration>,
    ) -> SampResult<SampValue> {
        let body = xmlrpc::encode_method_call(method, args);
        let mut request = self.http.post(endpoint).header("Content-Type", "text/xml").body(body);
        if let Some(timeout) = timeout {
            // Leave slack over the hub-side wait so a reply that lands right
            // at the hub's own deadline still has time to travel back.
            request = request.timeout(timeout + Duration::from_secs(5));
        }
        let resp = request
            .send()
            .await
            .map_err(|e| SampError::TransportFailure(e.to_string()))?;

        let text = resp
            .text()
            .await
            .map_err(|e| SampError::TransportFailure(e.to_string()))?;

        match xmlrpc::decode_method_response(&text)
            .map_err(|e| SampError::TransportFailure(e.to_string()))?
        {
            MethodResponse::Success(v) => Ok(v),
            MethodResponse::Fault(f) => Err(SampError::RemoteFailure {
                code: f.code,
                message: f.message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn times_out_against_an_unroutable_address() {
        let client = OutboundClient::new(Duration::from_millis(200));
        let result = client
            .call("http://10.255.255.1:1/xmlrpc", "samp.client.receiveNotification", &[])
            .await;
        assert!(result.is_err());
    }
}
