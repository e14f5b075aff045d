//! Property tests for the option-list encoder.
//!
//! The engine parses option lists left to right with brace nesting, so
//! the encoder's structural guarantees (balanced braces, one entry per
//! key, value bracing) are wire-format contracts.

use proptest::prelude::*;

use enpdf::{Color, OptionList, OptionValue};

/// Strategy: engine-style option keys.
fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,12}").expect("valid key regex")
}

/// Strategy: single-token values that need no bracing.
fn bare_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9%.]{1,16}").expect("valid bare value regex")
}

/// Strategy: multi-token values that must be braced.
fn spaced_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}( [a-z]{1,8}){1,3}").expect("valid spaced value regex")
}

/// Strategy: a mixed scalar option value.
fn scalar_strategy() -> impl Strategy<Value = OptionValue> {
    prop_oneof![
        (-1e9f64..1e9f64).prop_map(OptionValue::Number),
        bare_value_strategy().prop_map(OptionValue::Text),
        spaced_value_strategy().prop_map(OptionValue::Text),
        any::<bool>().prop_map(OptionValue::Bool),
        (0.0f64..=1.0).prop_map(|v| OptionValue::Color(Color::gray(v))),
        prop::collection::vec(-1e6f64..1e6f64, 1..5)
            .prop_map(|values| OptionValue::List(values.into_iter().map(OptionValue::Number).collect())),
    ]
}

/// Brace nesting depth must never go negative and must end at zero.
fn braces_balance(encoded: &str) -> bool {
    let mut depth = 0i32;
    for byte in encoded.bytes() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Number of `key=` entries at nesting depth zero.
fn top_level_entries(encoded: &str) -> usize {
    let mut depth = 0i32;
    let mut count = 0;
    for byte in encoded.bytes() {
        match byte {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'=' if depth == 0 => count += 1,
            _ => {}
        }
    }
    count
}

proptest! {
    /// Re-setting a key replaces the entry instead of appending.
    #[test]
    fn last_write_wins(key in key_strategy(), first in bare_value_strategy(), second in bare_value_strategy()) {
        let options = OptionList::new().with(&key, first).with(&key, second.clone());
        prop_assert_eq!(options.len(), 1);
        prop_assert_eq!(options.encode(), format!("{key}={second}"));
    }

    /// Single-token values encode without braces.
    #[test]
    fn bare_values_stay_bare(key in key_strategy(), value in bare_value_strategy()) {
        let encoded = OptionList::new().with(&key, value.clone()).encode();
        prop_assert_eq!(encoded, format!("{key}={value}"));
    }

    /// Multi-token values always come out braced, so the engine reads
    /// them as one value.
    #[test]
    fn spaced_values_get_braced(key in key_strategy(), value in spaced_value_strategy()) {
        let encoded = OptionList::new().with(&key, value.clone()).encode();
        prop_assert_eq!(encoded, format!("{key}={{{value}}}"));
    }

    /// Finite numbers survive an encode/parse round trip exactly.
    #[test]
    fn numbers_round_trip(value in -1e12f64..1e12f64) {
        let encoded = OptionValue::Number(value).encode();
        prop_assert_eq!(encoded.parse::<f64>().ok(), Some(value));
    }

    /// Whatever mix of values goes in, braces stay balanced and every
    /// key surfaces exactly once at the top level.
    #[test]
    fn structure_is_preserved(
        entries in prop::collection::hash_map(key_strategy(), scalar_strategy(), 1..8),
        flag in key_strategy(),
    ) {
        let mut options = OptionList::new();
        for (key, value) in &entries {
            options.set(key.clone(), value.clone());
        }
        options.flag(flag.as_str());

        let encoded = options.encode();
        prop_assert!(braces_balance(&encoded));
        prop_assert_eq!(top_level_entries(&encoded), entries.len());
    }

    /// Merging keeps the defaults' positions and lets the overrides win.
    #[test]
    fn merge_prefers_overrides(
        shared in key_strategy(),
        default_value in bare_value_strategy(),
        override_value in bare_value_strategy(),
        extra in key_strategy(),
        extra_value in bare_value_strategy(),
    ) {
        prop_assume!(shared != extra);
        let defaults = OptionList::new()
            .with(&shared, default_value)
            .with(&extra, extra_value.clone());
        let merged = OptionList::new()
            .with(&shared, override_value.clone())
            .merge_over(&defaults);

        prop_assert_eq!(
            merged.encode(),
            format!("{shared}={override_value} {extra}={extra_value}")
        );
    }

    /// Nested sub-lists keep the whole encoding balanced.
    #[test]
    fn nested_dicts_stay_balanced(
        outer in key_strategy(),
        inner in prop::collection::hash_map(key_strategy(), bare_value_strategy(), 1..4),
    ) {
        let mut sub = OptionList::new();
        for (key, value) in &inner {
            sub.set(key.clone(), value.clone());
        }
        let encoded = OptionList::new().with(&outer, sub).encode();
        let opening = format!("{outer}={{");
        prop_assert!(braces_balance(&encoded));
        prop_assert!(encoded.starts_with(&opening));
    }
}
