//! Builds the shared method dispatch table (§9: "replace dynamic
//! reflective dispatch with an explicit method dispatch table") for every
//! `samp.hub.*` method whose shape is identical across both profiles:
//! a private key first, then method-specific SAMP-value arguments.
//!
//! `register`/`declareCallback` (Standard-only) and `pullCallbacks`
//! (Web-only) are registered by each profile directly, since their
//! argument shapes or authentication paths differ.

use std::sync::Arc;
use std::time::Duration;

use samp_protocol::{ClientId, MType, Message, PrivateKey, SampError, SampResult};
use samp_transport::{MethodDispatcher, dispatch::handler};
use samp_types::{SampValue, ValueError};

use crate::hub::Hub;

fn malformed(reason: impl Into<String>) -> SampError {
    SampError::MalformedValue(ValueError::MalformedValue {
        reason: reason.into(),
        path: "root".to_string(),
    })
}

fn arg(args: &[SampValue], i: usize) -> SampResult<SampValue> {
    args.get(i)
        .cloned()
        .ok_or_else(|| malformed(format!("missing argument at position {i}")))
}

fn arg_str(args: &[SampValue], i: usize) -> SampResult<String> {
    arg(args, i)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("argument {i} must be a string")))
}

fn arg_message(args: &[SampValue], i: usize) -> SampResult<Message> {
    let value = arg(args, i)?;
    Message::from_samp_value(&value).ok_or_else(|| malformed("malformed {samp.mtype, samp.params} message"))
}

fn key_of(s: String) -> PrivateKey {
    PrivateKey::from_presented(s)
}

fn void() -> SampValue {
    SampValue::map()
}

/// Build the dispatch table for every profile-agnostic `samp.hub.*`
/// method, bound to `hub`.
pub fn build_dispatcher(hub: Arc<Hub>) -> MethodDispatcher {
    let mut d = MethodDispatcher::new();

    {
        let hub = hub.clone();
        d.register(
            "unregister",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    hub.unregister(&key).await?;
                    Ok(void())
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "declareMetadata",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let metadata = arg(&args, 1)?;
                    hub.declare_metadata(&key, metadata).await?;
                    Ok(void())
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "getMetadata",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let target = ClientId::from_raw(arg_str(&args, 1)?);
                    hub.get_metadata(&key, &target)
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "declareSubscriptions",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let subs = arg(&args, 1)?;
                    hub.declare_subscriptions(&key, subs).await?;
                    Ok(void())
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "getSubscriptions",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let target = ClientId::from_raw(arg_str(&args, 1)?);
                    hub.get_subscriptions(&key, &target)
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "getRegisteredClients",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let ids = hub.get_registered_clients(&key)?;
                    Ok(SampValue::list(ids.into_iter().map(|id| SampValue::string(id.to_string()))))
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "getSubscribedClients",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let mtype = MType::new(arg_str(&args, 1)?);
                    let pairs = hub.get_subscribed_clients(&key, &mtype)?;
                    let mut out = SampValue::map();
                    for (id, cfg) in pairs {
                        out.insert(id.to_string(), cfg);
                    }
                    Ok(out)
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "notify",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let recipient = ClientId::from_raw(arg_str(&args, 1)?);
                    let msg = arg_message(&args, 2)?;
                    hub.notify(&key, &recipient, msg).await?;
                    Ok(void())
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "notifyAll",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let msg = arg_message(&args, 1)?;
                    let ids = hub.notify_all(&key, msg).await?;
                    Ok(SampValue::list(ids.into_iter().map(|id| SampValue::string(id.to_string()))))
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "call",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let recipient = ClientId::from_raw(arg_str(&args, 1)?);
                    let tag = arg_str(&args, 2)?;
                    let msg = arg_message(&args, 3)?;
                    let msg_id = hub.call(&key, &recipient, tag, msg).await?;
                    Ok(SampValue::string(msg_id))
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "callAll",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let tag = arg_str(&args, 1)?;
                    let msg = arg_message(&args, 2)?;
                    let pairs = hub.call_all(&key, tag, msg).await?;
                    let mut out = SampValue::map();
                    for (id, msg_id) in pairs {
                        out.insert(id.to_string(), SampValue::string(msg_id));
                    }
                    Ok(out)
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "callAndWait",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let recipient = ClientId::from_raw(arg_str(&args, 1)?);
                    let msg = arg_message(&args, 2)?;
                    let timeout_secs: f64 = arg_str(&args, 3)?
                        .parse()
                        .map_err(|_| malformed("timeout must be a decimal number of seconds"))?;
                    let timeout = if timeout_secs <= 0.0 {
                        Duration::from_secs(600)
                    } else {
                        Duration::from_secs_f64(timeout_secs)
                    };
                    hub.call_and_wait(&key, &recipient, msg, timeout).await
                }
            }),
        );
    }
    {
        let hub = hub.clone();
        d.register(
            "reply",
            handler(move |args| {
                let hub = hub.clone();
                async move {
                    let key = key_of(arg_str(&args, 0)?);
                    let msg_id = arg_str(&args, 1)?;
                    let response = arg(&args, 2)?;
                    hub.reply(&key, &msg_id, response).await?;
                    Ok(void())
                }
            }),
        );
    }

    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use samp_protocol::HubConfig;

    #[tokio::test]
    async fn dispatches_unregister_through_the_shared_table() {
        let hub = Hub::new(HubConfig::new());
        let outcome = hub.register().await.unwrap();
        let dispatcher = build_dispatcher(hub.clone());

        let result = dispatcher
            .dispatch("unregister", vec![SampValue::string(outcome.private_key.as_str())])
            .await;
        assert!(result.is_ok());
        assert!(!hub.is_registered(&outcome.self_id));
    }

    #[tokio::test]
    async fn rejects_missing_arguments() {
        let hub = Hub::new(HubConfig::new());
        let dispatcher = build_dispatcher(hub);
        let err = dispatcher.dispatch("unregister", vec![]).await.unwrap_err();
        assert!(matches!(err, SampError::MalformedValue(_)));
    }
}
