//! Strict JSON codec for SAMP values.
//!
//! The JSON surface mirrors SAMP's "strings only" discipline: object keys
//! and every leaf must be a JSON string. Bare numbers, booleans, and
//! `null` are rejected on decode, which makes `from_json ∘ to_json` the
//! identity on validated values.

use serde_json::Value as Json;

use crate::error::{SampResult, ValueError};
use crate::value::SampValue;

/// Serialize a SAMP value to JSON text.
///
/// When `multiline` is true the output is pretty-printed with two-space
/// indentation; otherwise it is compact.
pub fn to_json(value: &SampValue, multiline: bool) -> String {
    let json = to_serde_json(value);
    if multiline {
        serde_json::to_string_pretty(&json).expect("SampValue encodes to valid JSON")
    } else {
        serde_json::to_string(&json).expect("SampValue encodes to valid JSON")
    }
}

/// Parse JSON text into a SAMP value, rejecting any non-string leaf.
pub fn from_json(text: &str) -> SampResult<SampValue> {
    let json: Json =
        serde_json::from_str(text).map_err(|e| ValueError::InvalidJson(e.to_string()))?;
    from_serde_json(&json)
}

fn to_serde_json(value: &SampValue) -> Json {
    match value {
        SampValue::String(s) => Json::String(s.clone()),
        SampValue::List(items) => Json::Array(items.iter().map(to_serde_json).collect()),
        SampValue::Map(entries) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in entries {
                obj.insert(k.clone(), to_serde_json(v));
            }
            Json::Object(obj)
        }
    }
}

fn from_serde_json(json: &Json) -> SampResult<SampValue> {
    match json {
        Json::String(s) => Ok(SampValue::String(s.clone())),
        Json::Array(items) => {
            let items = items
                .iter()
                .map(from_serde_json)
                .collect::<SampResult<Vec<_>>>()?;
            Ok(SampValue::List(items))
        }
        Json::Object(obj) => {
            let mut entries = Vec::with_capacity(obj.len());
            for (k, v) in obj {
                entries.push((k.clone(), from_serde_json(v)?));
            }
            Ok(SampValue::Map(entries))
        }
        Json::Null => Err(ValueError::MalformedValue {
            reason: "null is not a valid SAMP leaf".to_string(),
            path: "root".to_string(),
        }),
        Json::Bool(_) | Json::Number(_) => Err(ValueError::MalformedValue {
            reason: "SAMP values must be strings, arrays, or objects".to_string(),
            path: "root".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_validated_values() {
        let mut m = SampValue::map();
        m.insert("mtype", SampValue::string("test.ping"));
        m.insert(
            "params",
            SampValue::list([SampValue::string("a"), SampValue::string("b")]),
        );
        m.validate().unwrap();

        let text = to_json(&m, false);
        let back = from_json(&text).unwrap();
        back.validate().unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn rejects_bare_numbers() {
        assert!(from_json(r#"{"x": 1}"#).is_err());
    }

    #[test]
    fn rejects_bare_booleans() {
        assert!(from_json(r#"{"x": true}"#).is_err());
    }

    #[test]
    fn rejects_null() {
        assert!(from_json(r#"{"x": null}"#).is_err());
        assert!(from_json("null").is_err());
    }

    #[test]
    fn multiline_pretty_prints() {
        let m = SampValue::map();
        let compact = to_json(&m, false);
        let pretty = to_json(&m, true);
        assert_eq!(compact, "{}");
        assert_eq!(pretty, "{}");

        let mut m = SampValue::map();
        m.insert("a", SampValue::string("1"));
        assert!(to_json(&m, true).contains('\n'));
    }
}
