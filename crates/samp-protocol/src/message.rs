//! MTypes and the `call`/`notify` message envelope.

use std::fmt;

use samp_types::SampValue;

/// A dotted MType identifier, e.g. `table.load.votable`, or a subscription
/// pattern such as `table.*` / `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MType(String);

impl MType {
    /// Wrap a raw MType/pattern string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the MType as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into dotted components, e.g. `"a.b.c"` -> `["a", "b", "c"]`.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Whether this MType is itself a wildcard pattern (contains `*`).
    pub fn is_pattern(&self) -> bool {
        self.0.contains('*')
    }

    /// All patterns that would match this concrete MType, from most to
    /// least specific: the exact MType itself, every `a.b.*`-style prefix
    /// wildcard (most components first), and finally the bare `*`.
    ///
    /// Used by the subscription trie to enumerate candidate patterns in
    /// shadowing order (§4.4: "the most specific pattern's config
    /// mapping is what `getSubscribedClients` returns").
    pub fn match_candidates(&self) -> Vec<MType> {
        let parts: Vec<&str> = self.components().collect();
        let mut candidates = Vec::with_capacity(parts.len() + 1);
        candidates.push(self.clone());
        for i in (0..parts.len()).rev() {
            let mut prefix = parts[..i].join(".");
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push('*');
            candidates.push(MType::new(prefix));
        }
        candidates
    }
}

impl fmt::Display for MType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A `call`/`notify` message: an MType plus its parameters mapping.
#[derive(Debug, Clone)]
pub struct Message {
    /// The message's MType.
    pub mtype: MType,
    /// The message parameters, always a SAMP mapping.
    pub params: SampValue,
}

impl Message {
    /// Build a message, defaulting to an empty parameter mapping if none given.
    pub fn new(mtype: impl Into<MType>, params: Option<SampValue>) -> Self {
        Self {
            mtype: mtype.into(),
            params: params.unwrap_or_else(SampValue::map),
        }
    }

    /// Render as the `{mtype, params}` SAMP mapping used on the wire.
    pub fn to_samp_value(&self) -> SampValue {
        let mut m = SampValue::map();
        m.insert("samp.mtype", SampValue::string(self.mtype.as_str()));
        m.insert("samp.params", self.params.clone());
        m
    }

    /// Parse a `{samp.mtype, samp.params}` mapping off the wire.
    pub fn from_samp_value(value: &SampValue) -> Option<Self> {
        let mtype = value.get("samp.mtype")?.as_str()?.to_string();
        let params = value.get("samp.params").cloned().unwrap_or_else(SampValue::map);
        Some(Self::new(mtype, Some(params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_ordered_most_specific_first() {
        let m = MType::new("table.load.votable");
        let candidates: Vec<String> = m.match_candidates().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            candidates,
            vec![
                "table.load.votable",
                "table.load.*",
                "table.*",
                "*",
            ]
        );
    }

    #[test]
    fn single_component_mtype_candidates() {
        let m = MType::new("ping");
        let candidates: Vec<String> = m.match_candidates().iter().map(|c| c.to_string()).collect();
        assert_eq!(candidates, vec!["ping", "*"]);
    }

    #[test]
    fn message_round_trips_through_samp_value() {
        let msg = Message::new("test.ping", None);
        let encoded = msg.to_samp_value();
        let decoded = Message::from_samp_value(&encoded).unwrap();
        assert_eq!(decoded.mtype, msg.mtype);
    }
}
