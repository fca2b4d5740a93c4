//! The client registry: public id <-> private key, metadata,
//! subscriptions, and callback delivery state (§3 "Client record").

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::sync::Mutex as AsyncMutex;

use samp_protocol::{ClientId, ClientIdAllocator, PrivateKey};
use samp_types::SampValue;

/// How the hub reaches a registered client with `samp.client.*` callbacks.
#[derive(Debug, Clone)]
pub enum CallbackSink {
    /// No callback declared yet (§4.4 "REGISTERED (no callback)").
    None,
    /// Standard Profile: POST to this client-declared URL.
    Standard(String),
    /// Web Profile: push onto this client's pull-queue.
    Web(Arc<PullQueue>),
}

impl CallbackSink {
    /// Whether this client is eligible to appear in `getSubscribedClients`
    /// (§4.4: "Only a REGISTERED (with callback) client is eligible").
    pub fn is_registered_with_callback(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A Web Profile client's pending callback queue, bounded per §4.6
/// (default 4096; overflow drops the oldest and flags the client as
/// lagging).
#[derive(Debug)]
pub struct PullQueue {
    bound: usize,
    items: parking_lot::Mutex<VecDeque<SampValue>>,
    notify: Notify,
    lagging: AtomicBool,
}

impl PullQueue {
    /// Build an empty queue with the given bound.
    pub fn new(bound: usize) -> Self {
        Self {
            bound,
            items: parking_lot::Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            lagging: AtomicBool::new(false),
        }
    }

    /// Push a callback invocation. Drops the oldest entry and sets the
    /// lagging flag if the bound is exceeded. Returns `true` if an
    /// overflow occurred.
    pub fn push(&self, item: SampValue) -> bool {
        let overflowed = {
            let mut items = self.items.lock();
            items.push_back(item);
            if items.len() > self.bound {
                items.pop_front();
                true
            } else {
                false
            }
        };
        if overflowed {
            self.lagging.store(true, Ordering::Relaxed);
        }
        self.notify.notify_one();
        overflowed
    }

    /// Drain everything currently pending, without blocking.
    pub fn drain_available(&self) -> Vec<SampValue> {
        self.items.lock().drain(..).collect()
    }

    /// Whether this client has ever overflowed its queue.
    pub fn is_lagging(&self) -> bool {
        self.lagging.load(Ordering::Relaxed)
    }

    /// Wait until at least one item is pending, or the timeout elapses,
    /// then drain and return whatever is available (possibly empty on
    /// timeout, possibly more than one item otherwise), per §4.6
    /// `pullCallbacks`.
    pub async fn pull(&self, timeout: std::time::Duration) -> Vec<SampValue> {
        loop {
            let pending = self.drain_available();
            if !pending.is_empty() {
                return pending;
            }
            let notified = self.notify.notified();
            if tokio::time::timeout(timeout, notified).await.is_err() {
                return Vec::new();
            }
        }
    }
}

/// A registered client (§3 "Client record").
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// The hub-assigned public id.
    pub id: ClientId,
    /// The hub-issued private key authenticating this client's calls.
    pub private_key: PrivateKey,
    /// Declared metadata mapping, default empty.
    pub metadata: SampValue,
    /// Declared MType -> config subscriptions, default empty, in the raw
    /// wire shape (used by `getSubscriptions`).
    pub subscriptions: SampValue,
    /// How the hub delivers callbacks to this client.
    pub callback: CallbackSink,
}

impl ClientRecord {
    fn new(id: ClientId, private_key: PrivateKey) -> Self {
        Self {
            id,
            private_key,
            metadata: SampValue::map(),
            subscriptions: SampValue::map(),
            callback: CallbackSink::None,
        }
    }
}

/// The registry of live clients, keyed both by public id and by private
/// key, plus the id/key allocators. Registry *mutation* (register,
/// unregister, the private-key lookup that gates every other method) is
/// serialized behind `mutation_lock`; concurrent reads go straight to the
/// `DashMap`s (§5: "one writer-preferring mutex" in spirit, without
/// a single coarse lock on the hot lookup path).
#[derive(Debug)]
pub struct Registry {
    by_id: DashMap<ClientId, ClientRecord>,
    by_key: DashMap<PrivateKey, ClientId>,
    id_alloc: ClientIdAllocator,
    /// Guards allocation and the register/unregister state transition.
    pub mutation_lock: AsyncMutex<()>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_key: DashMap::new(),
            id_alloc: ClientIdAllocator::new(),
            mutation_lock: AsyncMutex::new(()),
        }
    }

    /// Number of currently registered clients.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry currently holds no clients.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Allocate a fresh id/key pair and insert an empty record. Caller
    /// must hold `mutation_lock`.
    pub fn insert_new(&self) -> ClientRecord {
        let id = self.id_alloc.allocate();
        let key = PrivateKey::generate();
        let record = ClientRecord::new(id.clone(), key.clone());
        self.by_id.insert(id.clone(), record.clone());
        self.by_key.insert(key, id);
        record
    }

    /// Insert a pre-allocated record with a given key (used by the Web
    /// Profile, whose keys carry a distinguishing prefix). Caller must
    /// hold `mutation_lock`.
    pub fn insert_with_key(&self, key: PrivateKey) -> ClientRecord {
        let id = self.id_alloc.allocate();
        let record = ClientRecord::new(id.clone(), key.clone());
        self.by_id.insert(id.clone(), record.clone());
        self.by_key.insert(key, id);
        record
    }

    /// Resolve a private key to the client id, if live.
    pub fn id_for_key(&self, key: &PrivateKey) -> Option<ClientId> {
        self.by_key.get(key).map(|e| e.value().clone())
    }

    /// Fetch a copy of a client record by id.
    pub fn get(&self, id: &ClientId) -> Option<ClientRecord> {
        self.by_id.get(id).map(|e| e.value().clone())
    }

    /// Resolve a private key straight to its client record.
    pub fn get_by_key(&self, key: &PrivateKey) -> Option<ClientRecord> {
        let id = self.id_for_key(key)?;
        self.get(&id)
    }

    /// Mutate a client record in place. No-op if the client is no longer
    /// registered.
    pub fn update<F: FnOnce(&mut ClientRecord)>(&self, id: &ClientId, f: F) {
        if let Some(mut entry) = self.by_id.get_mut(id) {
            f(entry.value_mut());
        }
    }

    /// Remove a client entirely. Caller must hold `mutation_lock`.
    pub fn remove(&self, id: &ClientId) -> Option<ClientRecord> {
        let record = self.by_id.remove(id).map(|(_, v)| v)?;
        self.by_key.remove(&record.private_key);
        Some(record)
    }

    /// All currently registered client ids (excluding the hub's own
    /// reserved id, which is never stored here).
    pub fn all_ids(&self) -> Vec<ClientId> {
        self.by_id.iter().map(|e| e.key().clone()).collect()
    }

    /// All currently registered client records.
    pub fn all_records(&self) -> Vec<ClientRecord> {
        self.by_id.iter().map(|e| e.value().clone()).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_resolve_by_key() {
        let reg = Registry::new();
        let rec = reg.insert_new();
        assert_eq!(reg.id_for_key(&rec.private_key), Some(rec.id.clone()));
        assert_eq!(reg.get(&rec.id).unwrap().id, rec.id);
    }

    #[test]
    fn remove_clears_both_indices() {
        let reg = Registry::new();
        let rec = reg.insert_new();
        reg.remove(&rec.id);
        assert!(reg.get(&rec.id).is_none());
        assert!(reg.id_for_key(&rec.private_key).is_none());
    }

    #[test]
    fn pull_queue_drops_oldest_on_overflow() {
        let q = PullQueue::new(3);
        for i in 0..5 {
            q.push(SampValue::string(i.to_string()));
        }
        assert!(q.is_lagging());
        let drained = q.drain_available();
        let values: Vec<&str> = drained.iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(values, vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn pull_times_out_when_empty() {
        let q = PullQueue::new(4);
        let items = q.pull(std::time::Duration::from_millis(20)).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn pull_wakes_on_push() {
        let q = Arc::new(PullQueue::new(4));
        let q2 = q.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            q2.push(SampValue::string("x"));
        });
        let items = q.pull(std::time::Duration::from_secs(2)).await;
        assert_eq!(items.len(), 1);
        handle.await.unwrap();
    }
}
