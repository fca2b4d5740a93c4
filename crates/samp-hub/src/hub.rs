//! The hub service itself (§4.4): the public contract table,
//! lifecycle broadcasts, and the notify/call/reply routing algorithms.

use std::sync::{Arc, OnceLock, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use rand::RngCore;
use tokio::sync::{mpsc, oneshot, RwLock, Semaphore};

use samp_protocol::{ClientId, HubConfig, MType, Message, PrivateKey, SampError, SampResult};
use samp_transport::OutboundClient;
use samp_types::SampValue;

use crate::observer::{HubEvent, HubObserver, LoggingObserver};
use crate::registry::{CallbackSink, PullQueue, Registry};
use crate::subscriptions::SubscriptionIndex;
use crate::tracking::{CallTrackingEntry, MsgId, TrackingTable};

const METHOD_RECEIVE_NOTIFICATION: &str = "receiveNotification";
const METHOD_RECEIVE_CALL: &str = "receiveCall";
const METHOD_RECEIVE_RESPONSE: &str = "receiveResponse";

const EVENT_REGISTER: &str = "samp.hub.event.register";
const EVENT_UNREGISTER: &str = "samp.hub.event.unregister";
const EVENT_METADATA: &str = "samp.hub.event.metadata";
const EVENT_SUBSCRIPTIONS: &str = "samp.hub.event.subscriptions";
const EVENT_SHUTDOWN: &str = "samp.hub.event.shutdown";

/// The 4-tuple returned by a successful `register` (§4.4).
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    /// The hub's own reserved id, for convenience.
    pub hub_id: ClientId,
    /// The newly allocated public id for this client.
    pub self_id: ClientId,
    /// The private key authenticating this client's subsequent calls.
    pub private_key: PrivateKey,
}

/// The hub service: registry, subscription index, router, and call
/// tracking table, plus a list of observers invoked on every lifecycle
/// and routing event (§9: pluggable observers instead of an
/// inheritance hierarchy).
pub struct Hub {
    config: HubConfig,
    registry: Registry,
    subscriptions: SubscriptionIndex,
    tracking: TrackingTable,
    observers: RwLock<Vec<Arc<dyn HubObserver>>>,
    outbound: OutboundClient,
    callback_semaphores: DashMap<ClientId, Arc<Semaphore>>,
    /// One ordered delivery worker per Standard Profile recipient, so
    /// `samp.client.*` POSTs for a given recipient are sent strictly in
    /// submission order (§5 ordering guarantees) instead of racing each
    /// other to the wire.
    standard_queues: DashMap<ClientId, mpsc::UnboundedSender<StandardDelivery>>,
    shutting_down: AtomicBool,
    /// A weak handle to this hub's own `Arc`, set once in [`Hub::new`], so
    /// spawned delivery tasks can fan an event out to observers without
    /// holding the `RwLock` guard across an `.await` outside this struct.
    self_weak: OnceLock<Weak<Hub>>,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("clients", &self.registry.len())
            .field("outstanding_calls", &self.tracking.len())
            .field("shutting_down", &self.shutting_down.load(Ordering::Relaxed))
            .finish()
    }
}

impl Hub {
    /// Build a hub with the given configuration and a default logging
    /// observer already attached.
    pub fn new(config: HubConfig) -> Arc<Self> {
        let hub = Arc::new(Self {
            outbound: OutboundClient::new(config.callback_timeout),
            config,
            registry: Registry::new(),
            subscriptions: SubscriptionIndex::new(),
            tracking: TrackingTable::new(),
            observers: RwLock::new(vec![Arc::new(LoggingObserver)]),
            callback_semaphores: DashMap::new(),
            standard_queues: DashMap::new(),
            shutting_down: AtomicBool::new(false),
            self_weak: OnceLock::new(),
        });
        let _ = hub.self_weak.set(Arc::downgrade(&hub));
        hub
    }

    fn arc_self(&self) -> Option<Arc<Hub>> {
        self.self_weak.get()?.upgrade()
    }

    /// Attach an additional observer (e.g. `samp-hubd`'s operator-facing
    /// one, or a test's message tracker).
    pub async fn add_observer(&self, observer: Arc<dyn HubObserver>) {
        self.observers.write().await.push(observer);
    }

    async fn emit(&self, event: HubEvent) {
        for observer in self.observers.read().await.iter() {
            observer.on_event(event.clone()).await;
        }
    }

    /// The hub's self-description, returned by `getMetadata("hub")`: not a
    /// new wire method, just the metadata the reserved `"hub"` client
    /// publishes about itself.
    pub fn hub_metadata(&self) -> SampValue {
        let mut m = SampValue::map();
        m.insert("samp.name", SampValue::string("samp-hubd"));
        m.insert("samp.description.text", SampValue::string("Rust SAMP hub"));
        m.insert("author.name", SampValue::string("samp-hubd"));
        m
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    fn resolve(&self, key: &PrivateKey) -> SampResult<ClientId> {
        self.registry.id_for_key(key).ok_or(SampError::UnknownClient)
    }

    fn require_registered(&self, id: &ClientId) -> SampResult<()> {
        // The hub's own reserved id may appear as a sender but never as a
        // recipient (§3 invariant), so it never satisfies this check.
        if self.registry.get(id).is_some() {
            Ok(())
        } else {
            Err(SampError::UnknownTarget(id.to_string()))
        }
    }

    // ---- registration -------------------------------------------------

    /// Register a new Standard Profile client. The profile validates the
    /// shared secret and catches `AuthFailure` itself; by the time this
    /// is called the credential has already been accepted.
    pub async fn register(&self) -> SampResult<RegisterOutcome> {
        if self.is_shutting_down() {
            return Err(SampError::HubShutdown);
        }
        let _guard = self.registry.mutation_lock.lock().await;
        if self.registry.len() >= self.config.max_clients {
            return Err(SampError::Overloaded("maximum registered clients reached".into()));
        }
        let record = self.registry.insert_new();
        drop(_guard);
        self.emit(HubEvent::ClientRegistered(record.id.clone())).await;
        self.broadcast_lifecycle(EVENT_REGISTER, &record.id, None).await;
        Ok(RegisterOutcome {
            hub_id: ClientId::from_raw(ClientId::HUB),
            self_id: record.id,
            private_key: record.private_key,
        })
    }

    /// Register a new Web Profile client. Web clients have no declared
    /// callback URL; they get a pull-queue immediately (§4.6).
    pub async fn register_web(&self) -> SampResult<RegisterOutcome> {
        if self.is_shutting_down() {
            return Err(SampError::HubShutdown);
        }
        let _guard = self.registry.mutation_lock.lock().await;
        if self.registry.len() >= self.config.max_clients {
            return Err(SampError::Overloaded("maximum registered clients reached".into()));
        }
        let key = PrivateKey::generate_web();
        let record = self.registry.insert_with_key(key);
        self.registry.update(&record.id, |r| {
            r.callback = CallbackSink::Web(Arc::new(PullQueue::new(self.config.max_pending_queue)));
        });
        drop(_guard);
        self.emit(HubEvent::ClientRegistered(record.id.clone())).await;
        self.broadcast_lifecycle(EVENT_REGISTER, &record.id, None).await;
        Ok(RegisterOutcome {
            hub_id: ClientId::from_raw(ClientId::HUB),
            self_id: record.id,
            private_key: record.private_key,
        })
    }

    /// `unregister`: removes the client record, abandons its tracking
    /// entries, and broadcasts the lifecycle event.
    pub async fn unregister(&self, key: &PrivateKey) -> SampResult<()> {
        let id = self.resolve(key)?;
        let _guard = self.registry.mutation_lock.lock().await;
        self.registry.remove(&id);
        drop(_guard);
        self.standard_queues.remove(&id);

        for (_msg_id, entry) in self.tracking.remove_involving(&id) {
            self.abandon(entry, &id).await;
        }

        self.emit(HubEvent::ClientUnregistered(id.clone())).await;
        self.broadcast_lifecycle(EVENT_UNREGISTER, &id, None).await;
        Ok(())
    }

    /// `declareCallback` (Standard Profile only): sets or replaces the
    /// client's callback URL.
    pub async fn declare_callback(&self, key: &PrivateKey, url: String) -> SampResult<()> {
        let id = self.resolve(key)?;
        self.registry.update(&id, |r| r.callback = CallbackSink::Standard(url));
        Ok(())
    }

    /// `declareMetadata`.
    pub async fn declare_metadata(&self, key: &PrivateKey, metadata: SampValue) -> SampResult<()> {
        let id = self.resolve(key)?;
        metadata.validate()?;
        self.registry.update(&id, |r| r.metadata = metadata);
        self.emit(HubEvent::MetadataChanged(id.clone())).await;
        self.broadcast_lifecycle(EVENT_METADATA, &id, None).await;
        Ok(())
    }

    /// `getMetadata`.
    pub fn get_metadata(&self, key: &PrivateKey, target: &ClientId) -> SampResult<SampValue> {
        self.resolve(key)?;
        if target.is_hub() {
            return Ok(self.hub_metadata());
        }
        self.registry
            .get(target)
            .map(|r| r.metadata)
            .ok_or_else(|| SampError::UnknownTarget(target.to_string()))
    }

    /// `declareSubscriptions`.
    pub async fn declare_subscriptions(&self, key: &PrivateKey, subs: SampValue) -> SampResult<()> {
        let id = self.resolve(key)?;
        subs.validate()?;
        self.subscriptions.set_subscriptions(&id, &subs);
        self.registry.update(&id, |r| r.subscriptions = subs);
        self.emit(HubEvent::SubscriptionsChanged(id.clone())).await;
        self.broadcast_lifecycle(EVENT_SUBSCRIPTIONS, &id, None).await;
        Ok(())
    }

    /// `getSubscriptions`.
    pub fn get_subscriptions(&self, key: &PrivateKey, target: &ClientId) -> SampResult<SampValue> {
        self.resolve(key)?;
        self.registry
            .get(target)
            .map(|r| r.subscriptions)
            .ok_or_else(|| SampError::UnknownTarget(target.to_string()))
    }

    /// `getRegisteredClients`: every live id except the caller and the hub.
    pub fn get_registered_clients(&self, key: &PrivateKey) -> SampResult<Vec<ClientId>> {
        let caller = self.resolve(key)?;
        Ok(self
            .registry
            .all_ids()
            .into_iter()
            .filter(|id| *id != caller)
            .collect())
    }

    /// `getSubscribedClients`: only clients registered *with* a callback
    /// are eligible (§4.4 state machine).
    pub fn get_subscribed_clients(
        &self,
        key: &PrivateKey,
        mtype: &MType,
    ) -> SampResult<Vec<(ClientId, SampValue)>> {
        self.resolve(key)?;
        Ok(self
            .subscriptions
            .subscribed_clients(mtype)
            .into_iter()
            .filter(|(id, _)| {
                self.registry
                    .get(id)
                    .is_some_and(|r| r.callback.is_registered_with_callback())
            })
            .collect())
    }

    // ---- messaging ------------------------------------------------------

    /// `notify`: fire-and-forget delivery to a single recipient.
    pub async fn notify(
        &self,
        key: &PrivateKey,
        recipient: &ClientId,
        msg: Message,
    ) -> SampResult<()> {
        let sender = self.resolve(key)?;
        msg.params.validate()?;
        self.require_registered(recipient)?;
        self.subscriptions
            .config_for(recipient, &msg.mtype)
            .ok_or_else(|| SampError::NotSubscribed(msg.mtype.to_string()))?;

        self.spawn_delivery(
            recipient.clone(),
            METHOD_RECEIVE_NOTIFICATION,
            vec![SampValue::string(sender.to_string()), msg.to_samp_value()],
        );
        self.emit(HubEvent::MessageRouted {
            sender,
            recipient: recipient.clone(),
            mtype: msg.mtype.to_string(),
        })
        .await;
        Ok(())
    }

    /// `notifyAll`: expands via subscription match, excludes the sender,
    /// and returns the recipient list before deliveries complete.
    pub async fn notify_all(&self, key: &PrivateKey, msg: Message) -> SampResult<Vec<ClientId>> {
        let sender = self.resolve(key)?;
        msg.params.validate()?;

        let recipients: Vec<ClientId> = self
            .subscriptions
            .subscribed_clients(&msg.mtype)
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| *id != sender)
            .collect();

        for recipient in &recipients {
            self.spawn_delivery(
                recipient.clone(),
                METHOD_RECEIVE_NOTIFICATION,
                vec![SampValue::string(sender.to_string()), msg.to_samp_value()],
            );
            self.emit(HubEvent::MessageRouted {
                sender: sender.clone(),
                recipient: recipient.clone(),
                mtype: msg.mtype.to_string(),
            })
            .await;
        }
        Ok(recipients)
    }

    /// `call`: records a tracking entry, delivers `receiveCall`, and
    /// returns the msg-id immediately.
    pub async fn call(
        &self,
        key: &PrivateKey,
        recipient: &ClientId,
        tag: String,
        msg: Message,
    ) -> SampResult<MsgId> {
        let sender = self.resolve(key)?;
        msg.params.validate()?;
        self.require_registered(recipient)?;
        self.subscriptions
            .config_for(recipient, &msg.mtype)
            .ok_or_else(|| SampError::NotSubscribed(msg.mtype.to_string()))?;

        let msg_id = self.mint_msg_id();
        self.tracking.insert(
            msg_id.clone(),
            CallTrackingEntry {
                sender: sender.clone(),
                recipient: recipient.clone(),
                tag,
                waiter: None,
            },
        );
        self.deliver_call(recipient.clone(), sender, msg_id.clone(), msg).await;
        Ok(msg_id)
    }

    /// `callAll`: expands via subscription match like `notifyAll`, but
    /// mints a msg-id per recipient.
    pub async fn call_all(
        &self,
        key: &PrivateKey,
        tag: String,
        msg: Message,
    ) -> SampResult<Vec<(ClientId, MsgId)>> {
        let sender = self.resolve(key)?;
        msg.params.validate()?;

        let recipients: Vec<ClientId> = self
            .subscriptions
            .subscribed_clients(&msg.mtype)
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| *id != sender)
            .collect();

        let mut out = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let msg_id = self.mint_msg_id();
            self.tracking.insert(
                msg_id.clone(),
                CallTrackingEntry {
                    sender: sender.clone(),
                    recipient: recipient.clone(),
                    tag: tag.clone(),
                    waiter: None,
                },
            );
            self.deliver_call(recipient.clone(), sender.clone(), msg_id.clone(), msg.clone())
                .await;
            out.push((recipient, msg_id));
        }
        Ok(out)
    }

    /// `callAndWait`: like `call`, but parks the caller on a one-shot
    /// rendezvous instead of returning the msg-id. A timeout yields a
    /// synthetic `samp.error` response rather than an RPC fault (§7:
    /// "synthetic samp.error payload for call variant").
    pub async fn call_and_wait(
        &self,
        key: &PrivateKey,
        recipient: &ClientId,
        msg: Message,
        timeout: Duration,
    ) -> SampResult<SampValue> {
        let sender = self.resolve(key)?;
        msg.params.validate()?;
        self.require_registered(recipient)?;
        self.subscriptions
            .config_for(recipient, &msg.mtype)
            .ok_or_else(|| SampError::NotSubscribed(msg.mtype.to_string()))?;

        let msg_id = self.mint_msg_id();
        let (tx, rx) = oneshot::channel();
        self.tracking.insert(
            msg_id.clone(),
            CallTrackingEntry {
                sender: sender.clone(),
                recipient: recipient.clone(),
                tag: "callAndWait".to_string(),
                waiter: Some(tx),
            },
        );
        self.deliver_call(recipient.clone(), sender, msg_id.clone(), msg).await;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) | Err(_) => {
                self.tracking.remove(&msg_id);
                Ok(synthetic_error("timed out waiting for a reply"))
            }
        }
    }

    /// `reply`: resolves the tracking entry, validates the replying
    /// client is the recorded recipient, and either fulfills the
    /// `callAndWait` rendezvous or delivers `receiveResponse`
    /// asynchronously.
    pub async fn reply(&self, key: &PrivateKey, msg_id: &str, response: SampValue) -> SampResult<()> {
        let responder = self.resolve(key)?;
        response.validate()?;

        let entry = self
            .tracking
            .remove(msg_id)
            .filter(|e| e.recipient == responder)
            .ok_or_else(|| SampError::UnknownMsgId(msg_id.to_string()))?;

        match entry.waiter {
            Some(tx) => {
                // Ignore a dropped receiver: the wait already timed out and
                // this is a late real reply (§4.4: "silently dropped").
                let _ = tx.send(response);
            }
            None => {
                self.spawn_delivery(
                    entry.sender,
                    METHOD_RECEIVE_RESPONSE,
                    vec![
                        SampValue::string(responder.to_string()),
                        SampValue::string(entry.tag),
                        response,
                    ],
                );
            }
        }
        Ok(())
    }

    /// `pullCallbacks` (Web Profile only): blocks up to `timeout` waiting
    /// for at least one pending callback on the caller's own queue, then
    /// returns the whole pending batch (§4.6).
    pub async fn pull_callbacks(&self, key: &PrivateKey, timeout: Duration) -> SampResult<Vec<SampValue>> {
        let id = self.resolve(key)?;
        let queue = self
            .web_queue(&id)
            .ok_or_else(|| SampError::TransportFailure("not a Web Profile client".into()))?;
        Ok(queue.pull(timeout).await)
    }

    // ---- shutdown ---------------------------------------------------------

    /// Broadcast `samp.hub.event.shutdown`, stop accepting registrations,
    /// cancel outstanding waiters, and drain in-flight deliveries for a
    /// grace period (§4.4 "Shutdown").
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emit(HubEvent::ShuttingDown).await;

        let hub_id = ClientId::from_raw(ClientId::HUB);
        let recipients = self.subscriptions.subscribed_clients(&MType::new(EVENT_SHUTDOWN));
        let msg = Message::new(EVENT_SHUTDOWN, Some(SampValue::map()));
        for (recipient, _) in recipients {
            self.spawn_delivery(
                recipient,
                METHOD_RECEIVE_NOTIFICATION,
                vec![SampValue::string(hub_id.to_string()), msg.to_samp_value()],
            );
        }

        for id in self.registry.all_ids() {
            for (_, entry) in self.tracking.remove_involving(&id) {
                if let Some(tx) = entry.waiter {
                    let _ = tx.send(synthetic_error("hub is shutting down"));
                }
            }
        }

        tokio::time::sleep(self.config.shutdown_grace).await;
    }

    // ---- internals ----------------------------------------------------

    fn mint_msg_id(&self) -> MsgId {
        let mut bytes = [0u8; 12];
        rand::rng().fill_bytes(&mut bytes);
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    async fn broadcast_lifecycle(&self, event: &str, subject: &ClientId, extra: Option<(&str, SampValue)>) {
        let mut params = SampValue::map();
        params.insert("id", SampValue::string(subject.to_string()));
        if let Some((k, v)) = extra {
            params.insert(k, v);
        }
        let msg = Message::new(event, Some(params));
        let hub_id = ClientId::from_raw(ClientId::HUB);
        let recipients = self.subscriptions.subscribed_clients(&MType::new(event));
        for (recipient, _) in recipients {
            self.spawn_delivery(
                recipient,
                METHOD_RECEIVE_NOTIFICATION,
                vec![SampValue::string(hub_id.to_string()), msg.to_samp_value()],
            );
        }
    }

    async fn deliver_call(&self, recipient: ClientId, sender: ClientId, msg_id: MsgId, msg: Message) {
        self.spawn_delivery(
            recipient.clone(),
            METHOD_RECEIVE_CALL,
            vec![
                SampValue::string(sender.to_string()),
                SampValue::string(msg_id),
                msg.to_samp_value(),
            ],
        );
        self.emit(HubEvent::MessageRouted {
            sender,
            recipient,
            mtype: msg.mtype.to_string(),
        })
        .await;
    }

    /// On unregistration of `abandoned_client`: an entry where it was the
    /// sender is simply dropped (no one left to notify); an entry where
    /// it was the recipient gets a synthetic `samp.error` back to the
    /// sender, if the sender is still alive (§4.4 (ii)).
    async fn abandon(&self, entry: CallTrackingEntry, abandoned_client: &ClientId) {
        if &entry.recipient != abandoned_client {
            // `abandoned_client` was the sender; nothing to deliver.
            if let Some(tx) = entry.waiter {
                let _ = tx.send(synthetic_error("sender unregistered"));
            }
            return;
        }
        let response = synthetic_error("recipient unregistered before replying");
        match entry.waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => {
                if self.registry.get(&entry.sender).is_some() {
                    self.spawn_delivery(
                        entry.sender,
                        METHOD_RECEIVE_RESPONSE,
                        vec![
                            SampValue::string(abandoned_client.to_string()),
                            SampValue::string(entry.tag),
                            response,
                        ],
                    );
                }
            }
        }
    }

    fn callback_semaphore(&self, client: &ClientId) -> Arc<Semaphore> {
        self.callback_semaphores
            .entry(client.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_callback_concurrency)))
            .clone()
    }

    /// Get or start the single ordered delivery worker for a Standard
    /// Profile recipient. `DashMap::entry` holds the shard lock across
    /// the `or_insert_with` closure, so two concurrent first-deliveries
    /// to the same recipient can't each spawn their own worker.
    fn standard_queue(&self, recipient: &ClientId) -> mpsc::UnboundedSender<StandardDelivery> {
        self.standard_queues
            .entry(recipient.clone())
            .or_insert_with(|| spawn_standard_worker(recipient.clone(), self.outbound.clone(), self.callback_semaphore(recipient)))
            .clone()
    }

    /// Deliver a callback outside the registry lock. Standard Profile
    /// deliveries are handed to that recipient's ordered worker so
    /// `samp.client.*` POSTs go out in submission order per recipient
    /// (§5 ordering guarantees); Web Profile deliveries push onto the
    /// recipient's pull-queue synchronously, which is already
    /// submission-ordered since nothing is spawned on that path.
    fn spawn_delivery(&self, recipient: ClientId, method: &'static str, args: Vec<SampValue>) {
        let Some(record) = self.registry.get(&recipient) else { return };
        match record.callback {
            CallbackSink::None => {}
            CallbackSink::Standard(url) => {
                let tx = self.standard_queue(&recipient);
                let _ = tx.send(StandardDelivery { url, method, args });
            }
            CallbackSink::Web(queue) => {
                let mut item = SampValue::map();
                item.insert("samp.methodName", SampValue::string(format!("samp.client.{method}")));
                item.insert("samp.params", SampValue::List(args));
                if queue.push(item) {
                    if let Some(hub) = self.arc_self() {
                        tokio::spawn(async move {
                            hub.emit(HubEvent::ClientLagging(recipient)).await;
                        });
                    }
                }
            }
        }
    }
}

/// One queued `samp.client.*` callback bound for a Standard Profile
/// client's declared callback URL.
struct StandardDelivery {
    url: String,
    method: &'static str,
    args: Vec<SampValue>,
}

/// Spawn the ordered delivery worker for one Standard Profile recipient.
/// It drains its channel strictly in FIFO order, making one outbound
/// POST at a time, so submission order into the channel is preserved on
/// the wire regardless of how long any individual POST takes.
fn spawn_standard_worker(
    recipient: ClientId,
    outbound: OutboundClient,
    sem: Arc<Semaphore>,
) -> mpsc::UnboundedSender<StandardDelivery> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StandardDelivery>();
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            let Ok(_permit) = sem.acquire().await else { continue };
            let full_method = format!("samp.client.{}", item.method);
            if let Err(err) = outbound.call(&item.url, &full_method, &item.args).await {
                tracing::warn!(client = %recipient, %err, "callback delivery failed");
            }
        }
    });
    tx
}

/// Build the `{samp.status: "samp.error", samp.error: {...}}` synthetic
/// response used for timeouts and abandoned calls (§4.4).
fn synthetic_error(reason: &str) -> SampValue {
    let mut err = SampValue::map();
    err.insert("samp.errortxt", SampValue::string(reason));
    let mut out = SampValue::map();
    out.insert("samp.status", SampValue::string("samp.error"));
    out.insert("samp.error", err);
    out
}

/// Snapshot accessors used by profiles and tests that need to inspect
/// hub state without going through the private-key-gated public methods
/// (e.g. a Web Profile's pull-queue lookup, or `getSubscribedClients`
/// callers that already resolved a target).
impl Hub {
    /// The configuration this hub was built with.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Fetch a client's pull-queue, if it is a registered Web client.
    pub fn web_queue(&self, id: &ClientId) -> Option<Arc<PullQueue>> {
        match self.registry.get(id)?.callback {
            CallbackSink::Web(queue) => Some(queue),
            _ => None,
        }
    }

    /// Whether a client id currently resolves to a live registration.
    pub fn is_registered(&self, id: &ClientId) -> bool {
        self.registry.get(id).is_some()
    }

    /// Number of currently registered clients, for diagnostics.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of outstanding call-tracking entries, for diagnostics/tests.
    pub fn outstanding_calls(&self) -> usize {
        self.tracking.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HubConfig {
        HubConfig::new().with_callback_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn register_allocates_distinct_ids_and_keys() {
        let hub = Hub::new(config());
        let a = hub.register().await.unwrap();
        let b = hub.register().await.unwrap();
        assert_ne!(a.self_id, b.self_id);
        assert_ne!(a.private_key, b.private_key);
    }

    #[tokio::test]
    async fn unregister_removes_client_and_resolve_fails() {
        let hub = Hub::new(config());
        let a = hub.register().await.unwrap();
        hub.unregister(&a.private_key).await.unwrap();
        let err = hub.get_metadata(&a.private_key, &a.self_id).unwrap_err();
        assert!(matches!(err, SampError::UnknownClient));
    }

    #[tokio::test]
    async fn get_registered_clients_excludes_self() {
        let hub = Hub::new(config());
        let a = hub.register().await.unwrap();
        let b = hub.register().await.unwrap();
        let seen = hub.get_registered_clients(&a.private_key).unwrap();
        assert_eq!(seen, vec![b.self_id]);
    }

    #[tokio::test]
    async fn notify_requires_subscription() {
        let hub = Hub::new(config());
        let x = hub.register().await.unwrap();
        let y = hub.register().await.unwrap();
        let msg = Message::new("test.ping", None);
        let err = hub.notify(&y.private_key, &x.self_id, msg).await.unwrap_err();
        assert!(matches!(err, SampError::NotSubscribed(_)));
    }

    #[tokio::test]
    async fn notify_unknown_target_fails() {
        let hub = Hub::new(config());
        let y = hub.register().await.unwrap();
        let msg = Message::new("test.ping", None);
        let err = hub
            .notify(&y.private_key, &ClientId::from_raw("c9999"), msg)
            .await
            .unwrap_err();
        assert!(matches!(err, SampError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn call_and_wait_times_out_with_synthetic_error() {
        let hub = Hub::new(config());
        let x = hub.register().await.unwrap();
        let y = hub.register().await.unwrap();
        hub.declare_subscriptions(&x.private_key, {
            let mut m = SampValue::map();
            m.insert("test.ping", SampValue::map());
            m
        })
        .await
        .unwrap();

        let msg = Message::new("test.ping", None);
        let response = hub
            .call_and_wait(&y.private_key, &x.self_id, msg, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(response.get("samp.status").unwrap().as_str(), Some("samp.error"));
        assert_eq!(hub.outstanding_calls(), 0);
    }

    #[tokio::test]
    async fn reply_fulfills_call_and_wait() {
        let hub = Hub::new(config());
        let x = hub.register().await.unwrap();
        let y = hub.register().await.unwrap();
        hub.declare_subscriptions(&x.private_key, {
            let mut m = SampValue::map();
            m.insert("test.ping", SampValue::map());
            m
        })
        .await
        .unwrap();

        let msg = Message::new("test.ping", None);
        let msg_id = hub
            .call(&y.private_key, &x.self_id, "tag1".to_string(), msg)
            .await
            .unwrap();

        let mut response = SampValue::map();
        response.insert("samp.status", SampValue::string("samp.ok"));
        hub.reply(&x.private_key, &msg_id, response).await.unwrap();
        assert_eq!(hub.outstanding_calls(), 0);
    }

    #[tokio::test]
    async fn unregister_abandons_pending_call() {
        let hub = Hub::new(config());
        let x = hub.register().await.unwrap();
        let y = hub.register().await.unwrap();
        hub.declare_subscriptions(&x.private_key, {
            let mut m = SampValue::map();
            m.insert("test.ping", SampValue::map());
            m
        })
        .await
        .unwrap();

        // Spawn the waiting call and unregister the recipient before it replies.
        let hub2 = hub.clone();
        let y_key = y.private_key.clone();
        let x_id = x.self_id.clone();
        let waiter = tokio::spawn(async move {
            let msg = Message::new("test.ping", None);
            hub2.call_and_wait(&y_key, &x_id, msg, Duration::from_secs(5)).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.unregister(&x.private_key).await.unwrap();
        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.get("samp.status").unwrap().as_str(), Some("samp.error"));
    }

    #[tokio::test]
    async fn wildcard_subscription_allows_notify() {
        let hub = Hub::new(config());
        let x = hub.register().await.unwrap();
        let y = hub.register().await.unwrap();
        hub.declare_subscriptions(&x.private_key, {
            let mut m = SampValue::map();
            m.insert("test.*", SampValue::map());
            m
        })
        .await
        .unwrap();

        hub.notify(&y.private_key, &x.self_id, Message::new("test.a.b", None))
            .await
            .unwrap();
        let err = hub
            .notify(&y.private_key, &x.self_id, Message::new("other.a", None))
            .await
            .unwrap_err();
        assert!(matches!(err, SampError::NotSubscribed(_)));
    }

    #[tokio::test]
    async fn overload_rejects_registration_past_the_limit() {
        let hub = Hub::new(HubConfig::new().with_max_clients(1));
        hub.register().await.unwrap();
        let err = hub.register().await.unwrap_err();
        assert!(matches!(err, SampError::Overloaded(_)));
    }
}
