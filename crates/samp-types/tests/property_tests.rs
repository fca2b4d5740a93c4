//! Property-based tests for the SAMP value model (spec §8, invariant #2):
//! `validate ∘ fromJson ∘ toJson ≡ id` on every validated SAMP value.

use proptest::prelude::*;

use samp_types::SampValue;

/// A SAMP-legal string: restricted to the printable-ASCII-plus-whitespace
/// charset the validator accepts, and non-empty so it can double as a map
/// key without colliding on the empty string in every test case.
fn samp_string() -> impl Strategy<Value = String> {
    "[ -~]{0,12}".prop_filter("charset-legal", |s| s.chars().all(|c| {
        let code = c as u32;
        code == 0x09 || code == 0x0A || code == 0x0D || (0x20..=0x7F).contains(&code)
    }))
}

fn samp_value() -> impl Strategy<Value = SampValue> {
    let leaf = samp_string().prop_map(SampValue::string);
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(SampValue::list),
            prop::collection::vec((samp_string(), inner), 0..6).prop_map(|entries| {
                let mut m = SampValue::map();
                for (k, v) in entries {
                    m.insert(k, v);
                }
                m
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every generated value that validates survives a JSON round trip
    /// unchanged and still validates afterward.
    #[test]
    fn json_round_trip_is_identity_on_validated_values(value in samp_value()) {
        if value.validate().is_err() {
            return Ok(());
        }
        let text = samp_types::to_json(&value, false);
        let back = samp_types::from_json(&text).expect("valid SAMP JSON decodes");
        back.validate().expect("round-tripped value still validates");
        prop_assert_eq!(value, back);
    }

    /// Pretty-printed JSON round-trips the same as compact JSON; the
    /// `multiline` flag only affects whitespace, never the decoded value.
    #[test]
    fn multiline_json_round_trips_the_same_as_compact(value in samp_value()) {
        if value.validate().is_err() {
            return Ok(());
        }
        let compact = samp_types::from_json(&samp_types::to_json(&value, false)).unwrap();
        let pretty = samp_types::from_json(&samp_types::to_json(&value, true)).unwrap();
        prop_assert_eq!(compact, pretty);
    }
}
