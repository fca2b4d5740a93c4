//! Subscription matching (§4.4 "Subscription matching"): exact
//! MType, `a.b.*`-style prefix wildcards, and the bare `*`, unioned with
//! most-specific-pattern-wins per recipient. Implemented as three
//! pattern-keyed maps rather than a literal trie node graph, keeping the
//! same cost profile: one hash probe per MType component per lookup, not
//! one per registered client.

use dashmap::DashMap;

use samp_protocol::{ClientId, MType};
use samp_types::SampValue;

/// The universal wildcard pattern.
const GLOBAL: &str = "*";

/// The subscription index shared by the hub. Each client's current
/// subscription set replaces its previous one atomically on
/// `declareSubscriptions` via [`SubscriptionIndex::set_subscriptions`].
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    /// Pattern without trailing `.*` (or empty string for the bare `*`
    /// case, handled separately) -> subscribers. Exact MType -> config.
    exact: DashMap<String, DashMap<ClientId, SampValue>>,
    /// Prefix (components before the trailing `.*`, joined with `.`, or
    /// empty string for a single-segment wildcard like `test.*`) ->
    /// subscribers.
    wildcard: DashMap<String, DashMap<ClientId, SampValue>>,
    /// Subscribers to the bare `*` pattern.
    global: DashMap<ClientId, SampValue>,
}

impl SubscriptionIndex {
    /// A fresh, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything `client` is subscribed to with `subs`, a
    /// `SampValue::Map` of pattern -> config.
    pub fn set_subscriptions(&self, client: &ClientId, subs: &SampValue) {
        self.clear(client);
        let Some(entries) = subs.as_map() else { return };
        for (pattern, config) in entries {
            self.insert(client, pattern, config.clone());
        }
    }

    /// Remove every subscription belonging to `client`.
    pub fn clear(&self, client: &ClientId) {
        self.exact.retain(|_, subs| {
            subs.remove(client);
            !subs.is_empty()
        });
        self.wildcard.retain(|_, subs| {
            subs.remove(client);
            !subs.is_empty()
        });
        self.global.remove(client);
    }

    fn insert(&self, client: &ClientId, pattern: &str, config: SampValue) {
        if pattern == GLOBAL {
            self.global.insert(client.clone(), config);
            return;
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            self.wildcard
                .entry(prefix.to_string())
                .or_default()
                .insert(client.clone(), config);
        } else if pattern == "*" {
            self.global.insert(client.clone(), config);
        } else {
            self.exact
                .entry(pattern.to_string())
                .or_default()
                .insert(client.clone(), config);
        }
    }

    /// All clients subscribed to `mtype`, each mapped to the config of the
    /// *most specific* matching pattern (§4.4).
    pub fn subscribed_clients(&self, mtype: &MType) -> Vec<(ClientId, SampValue)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for candidate in mtype.match_candidates() {
            let candidate = candidate.to_string();
            if candidate == GLOBAL {
                for entry in self.global.iter() {
                    if seen.insert(entry.key().clone()) {
                        out.push((entry.key().clone(), entry.value().clone()));
                    }
                }
                continue;
            }
            if let Some(prefix) = candidate.strip_suffix(".*") {
                if let Some(subs) = self.wildcard.get(prefix) {
                    for entry in subs.iter() {
                        if seen.insert(entry.key().clone()) {
                            out.push((entry.key().clone(), entry.value().clone()));
                        }
                    }
                }
            } else if let Some(subs) = self.exact.get(&candidate) {
                for entry in subs.iter() {
                    if seen.insert(entry.key().clone()) {
                        out.push((entry.key().clone(), entry.value().clone()));
                    }
                }
            }
        }
        out
    }

    /// Whether `client` is subscribed to `mtype`, and if so, the config of
    /// the most specific matching pattern.
    pub fn config_for(&self, client: &ClientId, mtype: &MType) -> Option<SampValue> {
        self.subscribed_clients(mtype)
            .into_iter()
            .find(|(id, _)| id == client)
            .map(|(_, cfg)| cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samp_protocol::ClientId;

    fn id(s: &str) -> ClientId {
        ClientId::from_raw(s)
    }

    fn subs(pairs: &[(&str, SampValue)]) -> SampValue {
        let mut m = SampValue::map();
        for (k, v) in pairs {
            m.insert(*k, v.clone());
        }
        m
    }

    #[test]
    fn exact_match_wins_over_wildcard() {
        let idx = SubscriptionIndex::new();
        idx.set_subscriptions(
            &id("c1"),
            &subs(&[("test.*", SampValue::string("wild")), ("test.ping", SampValue::string("exact"))]),
        );
        let cfg = idx.config_for(&id("c1"), &MType::new("test.ping"));
        assert_eq!(cfg.unwrap().as_str(), Some("exact"));
    }

    #[test]
    fn wildcard_matches_prefix() {
        let idx = SubscriptionIndex::new();
        idx.set_subscriptions(&id("c1"), &subs(&[("test.*", SampValue::map())]));
        assert!(idx.config_for(&id("c1"), &MType::new("test.a.b")).is_some());
        assert!(idx.config_for(&id("c1"), &MType::new("other.a")).is_none());
    }

    #[test]
    fn global_wildcard_matches_everything() {
        let idx = SubscriptionIndex::new();
        idx.set_subscriptions(&id("c1"), &subs(&[("*", SampValue::map())]));
        assert!(idx.config_for(&id("c1"), &MType::new("anything.at.all")).is_some());
    }

    #[test]
    fn replace_clears_previous_subscriptions() {
        let idx = SubscriptionIndex::new();
        idx.set_subscriptions(&id("c1"), &subs(&[("test.ping", SampValue::map())]));
        idx.set_subscriptions(&id("c1"), &subs(&[("other.mtype", SampValue::map())]));
        assert!(idx.config_for(&id("c1"), &MType::new("test.ping")).is_none());
        assert!(idx.config_for(&id("c1"), &MType::new("other.mtype")).is_some());
    }

    #[test]
    fn unions_across_distinct_clients() {
        let idx = SubscriptionIndex::new();
        idx.set_subscriptions(&id("c1"), &subs(&[("test.ping", SampValue::map())]));
        idx.set_subscriptions(&id("c2"), &subs(&[("test.*", SampValue::map())]));
        let recipients: Vec<ClientId> = idx
            .subscribed_clients(&MType::new("test.ping"))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(recipients.len(), 2);
        assert!(recipients.contains(&id("c1")));
        assert!(recipients.contains(&id("c2")));
    }

    #[test]
    fn clear_removes_client_from_every_pattern() {
        let idx = SubscriptionIndex::new();
        idx.set_subscriptions(&id("c1"), &subs(&[("test.ping", SampValue::map()), ("*", SampValue::map())]));
        idx.clear(&id("c1"));
        assert!(idx.config_for(&id("c1"), &MType::new("test.ping")).is_none());
        assert!(idx.config_for(&id("c1"), &MType::new("anything")).is_none());
    }
}
