//! The SAMP value: a recursive tree of strings, lists, and mappings.
//!
//! Per the Standard Profile, every leaf is a string restricted to
//! `0x09`, `0x0A`, `0x0D`, and `0x20..=0x7F`. Scalars (integers, floats,
//! booleans) are carried as their decimal/`0`/`1` string form by convention;
//! this type does not distinguish them from any other string.

use crate::error::{Path, SampResult, ValueError};

/// A single key/value pair in a SAMP mapping, in insertion order.
pub type SampMap = Vec<(String, SampValue)>;

/// A SAMP value: string, ordered list, or ordered mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum SampValue {
    /// A restricted-charset string.
    String(String),
    /// An ordered list of values.
    List(Vec<SampValue>),
    /// An ordered string-keyed mapping.
    Map(SampMap),
}

impl SampValue {
    /// Build a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = SampValue>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Build an empty mapping.
    pub fn map() -> Self {
        Self::Map(Vec::new())
    }

    /// Encode a boolean per SAMP convention (`"1"` / `"0"`).
    pub fn from_bool(b: bool) -> Self {
        Self::String(if b { "1".to_string() } else { "0".to_string() })
    }

    /// Encode an integer per SAMP convention (decimal string).
    pub fn from_i64(n: i64) -> Self {
        Self::String(n.to_string())
    }

    /// Encode a float per SAMP convention. Rejects `NaN` and infinities
    /// since the wire form excludes them.
    pub fn from_f64(n: f64) -> Option<Self> {
        if n.is_finite() {
            Some(Self::String(format!("{n}")))
        } else {
            None
        }
    }

    /// Borrow as a string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a list, if this is a list value.
    pub fn as_list(&self) -> Option<&[SampValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a mapping, if this is a mapping value.
    pub fn as_map(&self) -> Option<&SampMap> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a mapping value. Returns `None` if this isn't a
    /// mapping or the key is absent.
    pub fn get(&self, key: &str) -> Option<&SampValue> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Decode a SAMP boolean string (`"1"`/`"0"`, tolerating `"true"`/`"false"`).
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_str()? {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }

    /// Decode a SAMP integer string.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_str()?.parse().ok()
    }

    /// Insert or replace a key in a mapping, preserving first-insertion
    /// position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: SampValue) {
        let key = key.into();
        if let Self::Map(entries) = self {
            if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                entries.push((key, value));
            }
        }
    }

    /// Depth-first validation: rejects non-string mapping keys (structurally
    /// impossible here, kept for symmetry with the wire decoder which can
    /// produce one), out-of-range string characters, and anything that
    /// isn't a string/list/mapping.
    pub fn validate(&self) -> SampResult<()> {
        self.validate_at(&Path::root())
    }

    fn validate_at(&self, path: &Path) -> SampResult<()> {
        match self {
            Self::String(s) => validate_chars(s, path),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.validate_at(&path.index(i))?;
                }
                Ok(())
            }
            Self::Map(entries) => {
                for (k, v) in entries {
                    validate_chars(k, path)?;
                    v.validate_at(&path.key(k))?;
                }
                Ok(())
            }
        }
    }
}

fn validate_chars(s: &str, path: &Path) -> SampResult<()> {
    for c in s.chars() {
        let code = c as u32;
        let allowed = code == 0x09 || code == 0x0A || code == 0x0D || (0x20..=0x7F).contains(&code);
        if !allowed {
            return Err(ValueError::malformed(
                format!("character U+{code:04X} outside the SAMP string charset"),
                path.to_string(),
            ));
        }
    }
    Ok(())
}

impl From<&str> for SampValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for SampValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_plain_strings() {
        let v = SampValue::string("hello world");
        assert!(v.validate().is_ok());
    }

    #[test]
    fn rejects_control_characters() {
        let v = SampValue::string("bad\u{0001}char");
        assert!(v.validate().is_err());
    }

    #[test]
    fn validates_nested_structures() {
        let mut m = SampValue::map();
        m.insert("mtype", SampValue::string("test.ping"));
        m.insert("params", SampValue::list([SampValue::string("a")]));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn reports_path_to_bad_leaf() {
        let mut m = SampValue::map();
        m.insert("params", SampValue::list([SampValue::string("\u{0001}")]));
        let err = m.validate().unwrap_err();
        match err {
            ValueError::MalformedValue { path, .. } => assert_eq!(path, "root.params[0]"),
            _ => panic!("wrong error variant"),
        }
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut m = SampValue::map();
        m.insert("a", SampValue::string("1"));
        m.insert("b", SampValue::string("2"));
        m.insert("a", SampValue::string("3"));
        let entries = m.as_map().unwrap();
        assert_eq!(entries[0], ("a".to_string(), SampValue::string("3")));
        assert_eq!(entries[1].0, "b");
    }

    #[test]
    fn bool_and_int_convention() {
        assert_eq!(SampValue::from_bool(true).as_str(), Some("1"));
        assert_eq!(SampValue::from_i64(42).as_str(), Some("42"));
        assert_eq!(SampValue::from_f64(f64::NAN), None);
    }
}
