//! End-to-end round trips through both profiles: a Standard Profile
//! call/reply exchange, and a Web Profile pull-queue notification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex};

use samp_client::{MessageHandler, StandardClient, WebClient};
use samp_hub::Hub;
use samp_protocol::{HubConfig, Message};
use samp_standard::StandardProfile;
use samp_types::SampValue;

struct CallRelay {
    tx: mpsc::UnboundedSender<(String, String, Message)>,
}

#[async_trait]
impl MessageHandler for CallRelay {
    async fn receive_call(&self, sender_id: String, msg_id: String, message: Message) {
        let _ = self.tx.send((sender_id, msg_id, message));
    }
}

struct ResponseCatcher {
    tx: Mutex<Option<oneshot::Sender<SampValue>>>,
}

#[async_trait]
impl MessageHandler for ResponseCatcher {
    async fn receive_response(&self, _responder_id: String, _tag: String, response: SampValue) {
        if let Some(tx) = self.tx.lock().await.take() {
            let _ = tx.send(response);
        }
    }
}

#[tokio::test]
async fn standard_profile_round_trip_call_and_reply() {
    let hub = Hub::new(HubConfig::default());
    let dir = tempfile::tempdir().unwrap();
    let lockfile_path = dir.path().join(".samp");
    let handle = StandardProfile::start(hub.clone(), Some(lockfile_path.clone()))
        .await
        .unwrap();

    let (call_tx, mut call_rx) = mpsc::unbounded_channel();
    let x = StandardClient::connect(Some(lockfile_path.clone()), Arc::new(CallRelay { tx: call_tx }))
        .await
        .unwrap();
    let mut subs = SampValue::map();
    subs.insert("test.ping", SampValue::map());
    x.core().declare_subscriptions(subs).await.unwrap();

    let (response_tx, response_rx) = oneshot::channel();
    let y = StandardClient::connect(
        Some(lockfile_path.clone()),
        Arc::new(ResponseCatcher {
            tx: Mutex::new(Some(response_tx)),
        }),
    )
    .await
    .unwrap();

    let msg = Message::new("test.ping", Some(SampValue::map()));
    y.core().call(x.core().self_id(), "tag7", msg).await.unwrap();

    let (sender_id, msg_id, received) = tokio::time::timeout(Duration::from_secs(5), call_rx.recv())
        .await
        .expect("receiveCall within timeout")
        .expect("channel open");
    assert_eq!(sender_id, y.core().self_id().to_string());
    assert_eq!(received.mtype.as_str(), "test.ping");

    let mut ok = SampValue::map();
    ok.insert("samp.status", SampValue::string("samp.ok"));
    x.core().reply(&msg_id, ok.clone()).await.unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), response_rx)
        .await
        .expect("receiveResponse within timeout")
        .expect("sender not dropped");
    assert_eq!(response.get("samp.status").and_then(|v| v.as_str()), Some("samp.ok"));

    x.disconnect().await.unwrap();
    y.disconnect().await.unwrap();
    handle.stop().await;
}

#[tokio::test]
async fn web_profile_pull_queue_delivers_notifications() {
    use samp_web::{AllowAllAuthorizer, AllowAnyOrigin, WebProfile};

    let hub = Hub::new(HubConfig::default());
    let addr = "127.0.0.1:0".parse().unwrap();
    let handle = WebProfile::start(
        hub.clone(),
        addr,
        Arc::new(AllowAllAuthorizer),
        Arc::new(AllowAnyOrigin),
    )
    .await
    .unwrap();

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    struct NotifyRelay {
        tx: mpsc::UnboundedSender<Message>,
    }
    #[async_trait]
    impl MessageHandler for NotifyRelay {
        async fn receive_notification(&self, _sender_id: String, message: Message) {
            let _ = self.tx.send(message);
        }
    }

    let receiver = WebClient::connect(
        handle.base_url(),
        Arc::new(NotifyRelay { tx: notify_tx }),
        Duration::from_millis(200),
    )
    .await
    .unwrap();
    let mut subs = SampValue::map();
    subs.insert("test.ping", SampValue::map());
    receiver.core().declare_subscriptions(subs).await.unwrap();

    let sender = WebClient::connect(handle.base_url(), Arc::new(samp_client::NoopHandler), Duration::from_millis(200))
        .await
        .unwrap();

    sender
        .core()
        .notify(receiver.core().self_id(), Message::new("test.ping", None))
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), notify_rx.recv())
        .await
        .expect("notification within timeout")
        .expect("channel open");
    assert_eq!(received.mtype.as_str(), "test.ping");

    sender.disconnect().await.unwrap();
    receiver.disconnect().await.unwrap();
    handle.stop().await;
}
