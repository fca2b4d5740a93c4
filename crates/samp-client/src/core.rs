//! The RPC surface common to both profiles once a client is registered:
//! every `samp.hub.*` method except `register`/`declareCallback`/
//! `pullCallbacks`, which differ by profile (mirrors the split in
//! `samp_hub::build_dispatcher`).

use std::time::Duration;

use samp_protocol::{ClientId, MType, Message, PrivateKey, SampError, SampResult};
use samp_transport::OutboundClient;
use samp_types::SampValue;

/// A registered client's handle to the hub's shared RPC surface.
#[derive(Debug, Clone)]
pub struct Core {
    outbound: OutboundClient,
    hub_url: String,
    self_id: ClientId,
    private_key: PrivateKey,
}

impl Core {
    pub(crate) fn new(
        outbound: OutboundClient,
        hub_url: String,
        self_id: ClientId,
        private_key: PrivateKey,
    ) -> Self {
        Self {
            outbound,
            hub_url,
            self_id,
            private_key,
        }
    }

    /// This client's hub-assigned public id.
    pub fn self_id(&self) -> &ClientId {
        &self.self_id
    }

    /// This client's private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    async fn call_hub(&self, method: &str, args: Vec<SampValue>) -> SampResult<SampValue> {
        self.outbound
            .call(&self.hub_url, &format!("samp.hub.{method}"), &args)
            .await
    }

    fn key_arg(&self) -> SampValue {
        SampValue::string(self.private_key.as_str())
    }

    fn ids_from_list(value: SampValue) -> Vec<ClientId> {
        value
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| ClientId::from_raw(s.to_string()))
            .collect()
    }

    /// `unregister`.
    pub async fn unregister(&self) -> SampResult<()> {
        self.call_hub("unregister", vec![self.key_arg()]).await?;
        Ok(())
    }

    /// `declareMetadata`.
    pub async fn declare_metadata(&self, metadata: SampValue) -> SampResult<()> {
        self.call_hub("declareMetadata", vec![self.key_arg(), metadata]).await?;
        Ok(())
    }

    /// `getMetadata`.
    pub async fn get_metadata(&self, target: &ClientId) -> SampResult<SampValue> {
        self.call_hub("getMetadata", vec![self.key_arg(), SampValue::string(target.to_string())])
            .await
    }

    /// `declareSubscriptions`.
    pub async fn declare_subscriptions(&self, subscriptions: SampValue) -> SampResult<()> {
        self.call_hub("declareSubscriptions", vec![self.key_arg(), subscriptions]).await?;
        Ok(())
    }

    /// `getSubscriptions`.
    pub async fn get_subscriptions(&self, target: &ClientId) -> SampResult<SampValue> {
        self.call_hub(
            "getSubscriptions",
            vec![self.key_arg(), SampValue::string(target.to_string())],
        )
        .await
    }

    /// `getRegisteredClients`.
    pub async fn get_registered_clients(&self) -> SampResult<Vec<ClientId>> {
        let value = self.call_hub("getRegisteredClients", vec![self.key_arg()]).await?;
        Ok(Self::ids_from_list(value))
    }

    /// `getSubscribedClients`.
    pub async fn get_subscribed_clients(&self, mtype: &MType) -> SampResult<Vec<ClientId>> {
        let value = self
            .call_hub(
                "getSubscribedClients",
                vec![self.key_arg(), SampValue::string(mtype.to_string())],
            )
            .await?;
        Ok(value
            .as_map()
            .map(|m| m.iter().map(|(id, _)| ClientId::from_raw(id.clone())).collect())
            .unwrap_or_default())
    }

    /// `notify`.
    pub async fn notify(&self, recipient: &ClientId, message: Message) -> SampResult<()> {
        self.call_hub(
            "notify",
            vec![self.key_arg(), SampValue::string(recipient.to_string()), message.to_samp_value()],
        )
        .await?;
        Ok(())
    }

    /// `notifyAll`.
    pub async fn notify_all(&self, message: Message) -> SampResult<Vec<ClientId>> {
        let value = self
            .call_hub("notifyAll", vec![self.key_arg(), message.to_samp_value()])
            .await?;
        Ok(Self::ids_from_list(value))
    }

    /// `call`: returns the hub-minted msg-id immediately.
    pub async fn call(&self, recipient: &ClientId, tag: impl Into<String>, message: Message) -> SampResult<String> {
        let value = self
            .call_hub(
                "call",
                vec![
                    self.key_arg(),
                    SampValue::string(recipient.to_string()),
                    SampValue::string(tag.into()),
                    message.to_samp_value(),
                ],
            )
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SampError::TransportFailure("malformed call response".into()))
    }

    /// `callAndWait`: blocks on the hub's rendezvous up to `timeout`. Uses
    /// an extended transport timeout so the underlying HTTP request
    /// outlives the hub's own wait (§5: `callAndWait` is one of the
    /// few calls allowed to block beyond RPC parsing).
    pub async fn call_and_wait(&self, recipient: &ClientId, message: Message, timeout: Duration) -> SampResult<SampValue> {
        self.outbound
            .call_with_timeout(
                &self.hub_url,
                "samp.hub.callAndWait",
                &[
                    self.key_arg(),
                    SampValue::string(recipient.to_string()),
                    message.to_samp_value(),
                    SampValue::string(format!("{:.3}", timeout.as_secs_f64())),
                ],
                Some(timeout),
            )
            .await
    }

    /// `reply`: answers a `receiveCall`'s `msg_id`.
    pub async fn reply(&self, msg_id: &str, response: SampValue) -> SampResult<()> {
        self.call_hub("reply", vec![self.key_arg(), SampValue::string(msg_id), response])
            .await?;
        Ok(())
    }
}
