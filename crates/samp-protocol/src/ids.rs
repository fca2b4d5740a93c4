//! Client identifiers and private keys.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// A hub-assigned public client id (e.g. `"c0001"`), used on the wire and
/// disclosed to every other client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// The hub's own reserved id. Never returned by `register`.
    pub const HUB: &'static str = samp_types::HUB_SELF_ID;

    /// Wrap a raw string as a client id without validation. Used when
    /// decoding ids received from clients over the wire.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the hub's own reserved id.
    pub fn is_hub(&self) -> bool {
        self.0 == Self::HUB
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic, process-wide counter used to allocate short alphanumeric
/// public ids (`c0001`, `c0002`, ...), as §4.4 describes.
#[derive(Debug, Default)]
pub struct ClientIdAllocator {
    next: AtomicU64,
}

impl ClientIdAllocator {
    /// Create a fresh allocator starting at `c0001`.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next public id.
    pub fn allocate(&self) -> ClientId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        ClientId(format!("c{n:04}"))
    }
}

/// A hub-issued, opaque authentication token. Never disclosed to other
/// clients. Equality is constant-time to avoid timing side-channels on
/// the hot authentication path.
#[derive(Clone)]
pub struct PrivateKey(String);

impl PrivateKey {
    /// Generate a fresh private key: 18 random bytes, base64url-encoded
    /// (24 characters), from a cryptographically-adequate RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 18];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Generate a Web Profile key, distinguishable from Standard Profile
    /// keys by the `wk:` prefix (§4.6).
    pub fn generate_web() -> Self {
        let Self(inner) = Self::generate();
        Self(format!("wk:{inner}"))
    }

    /// Wrap a raw string presented by a client without validation.
    pub fn from_presented(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the key as a string slice. Callers should avoid logging this.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}
impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(***)")
    }
}

// dashmap needs Hash for key lookups when PrivateKey is used as a map key.
impl std::hash::Hash for PrivateKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic_and_zero_padded() {
        let alloc = ClientIdAllocator::new();
        assert_eq!(alloc.allocate().as_str(), "c0001");
        assert_eq!(alloc.allocate().as_str(), "c0002");
    }

    #[test]
    fn keys_are_unique_and_equal_to_themselves() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn web_keys_carry_prefix() {
        assert!(PrivateKey::generate_web().as_str().starts_with("wk:"));
    }

    #[test]
    fn debug_never_prints_key_material() {
        let k = PrivateKey::generate();
        assert_eq!(format!("{k:?}"), "PrivateKey(***)");
    }
}
