//! Option list construction and encoding.
//!
//! The engine configures every primitive through textual option lists with
//! the grammar `entry (' ' entry)*` where `entry := key '=' value | value`
//! and `value := bareword | '{' entry* '}'`. This module builds those
//! strings from typed values so callers never concatenate wire syntax by
//! hand. Encoding is pure: the same tree encodes to the same text, and
//! resource references are resolved to raw handles only at encoding time.

use std::fmt;

use crate::color::Color;
use crate::handle::HandleRef;

/// A single typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Rendered as the barewords `true` / `false`.
    Bool(bool),
    /// Rendered verbatim with the shortest round-trip float form.
    Number(f64),
    /// Rendered verbatim; wrapped in braces when it contains whitespace,
    /// an `=`, or is empty.
    Text(String),
    /// A late-bound resource reference, resolved when the list is encoded.
    Handle(HandleRef),
    /// A color, rendered as its bare `keyword v1 v2 ...` sequence.
    Color(Color),
    /// An ordered positional sub-list, rendered as a `{ ... }` block.
    List(Vec<OptionValue>),
    /// A keyed sub-list, rendered as a `{ ... }` block of `key=value` entries.
    Dict(OptionList),
}

fn needs_braces(text: &str) -> bool {
    text.is_empty() || text.contains('=') || text.contains(char::is_whitespace)
}

impl OptionValue {
    /// Encode a single value.
    pub fn encode(&self) -> String {
        match self {
            OptionValue::Bool(value) => value.to_string(),
            OptionValue::Number(value) => value.to_string(),
            OptionValue::Text(text) => {
                if needs_braces(text) {
                    format!("{{{text}}}")
                } else {
                    text.clone()
                }
            }
            OptionValue::Handle(handle) => handle.get().to_string(),
            OptionValue::Color(color) => color.encode(),
            OptionValue::List(items) => {
                let inner: Vec<String> = items.iter().map(OptionValue::encode_token).collect();
                format!("{{{}}}", inner.join(" "))
            }
            OptionValue::Dict(list) => format!("{{{}}}", list.encode()),
        }
    }

    // Encode for an entry or list-element position, where a multi-token
    // sequence must parse as one value. Only colors render bare from
    // `encode`, so only they need the extra wrap here.
    fn encode_token(&self) -> String {
        match self {
            OptionValue::Color(color) => {
                let text = color.encode();
                if needs_braces(&text) {
                    format!("{{{text}}}")
                } else {
                    text
                }
            }
            _ => self.encode(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<usize> for OptionValue {
    fn from(value: usize) -> Self {
        OptionValue::Number(value as f64)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<Color> for OptionValue {
    fn from(value: Color) -> Self {
        OptionValue::Color(value)
    }
}

impl From<HandleRef> for OptionValue {
    fn from(value: HandleRef) -> Self {
        OptionValue::Handle(value)
    }
}

impl From<&HandleRef> for OptionValue {
    fn from(value: &HandleRef) -> Self {
        OptionValue::Handle(value.clone())
    }
}

impl From<Vec<OptionValue>> for OptionValue {
    fn from(values: Vec<OptionValue>) -> Self {
        OptionValue::List(values)
    }
}

impl<const N: usize> From<[f64; N]> for OptionValue {
    fn from(values: [f64; N]) -> Self {
        OptionValue::List(values.iter().copied().map(OptionValue::Number).collect())
    }
}

impl From<&[f64]> for OptionValue {
    fn from(values: &[f64]) -> Self {
        OptionValue::List(values.iter().copied().map(OptionValue::Number).collect())
    }
}

impl From<OptionList> for OptionValue {
    fn from(list: OptionList) -> Self {
        OptionValue::Dict(list)
    }
}

/// An ordered list of keyed entries and positional flags.
///
/// Insertion order is preserved through encoding; the engine parses
/// options left to right, so order is part of the wire contract.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionList {
    entries: Vec<(Option<String>, OptionValue)>,
}

impl OptionList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a keyed entry, replacing an existing entry in place so the
    /// list keeps its original order.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.as_deref() == Some(key.as_str()))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((Some(key), value)),
        }
    }

    /// Append a positional (key-less) flag.
    pub fn flag(&mut self, value: impl Into<OptionValue>) {
        self.entries.push((None, value.into()));
    }

    /// Set a keyed entry only when a value is present.
    pub fn maybe(&mut self, key: impl Into<String>, value: Option<impl Into<OptionValue>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Chaining form of [`OptionList::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Chaining form of [`OptionList::flag`].
    pub fn with_flag(mut self, value: impl Into<OptionValue>) -> Self {
        self.flag(value);
        self
    }

    /// Chaining form of [`OptionList::maybe`].
    pub fn with_maybe(
        mut self,
        key: impl Into<String>,
        value: Option<impl Into<OptionValue>>,
    ) -> Self {
        self.maybe(key, value);
        self
    }

    /// Look up a keyed entry.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// Whether a keyed entry exists.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a keyed entry.
    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k.as_deref() != Some(key));
    }

    /// Number of entries, flags included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (Option<&str>, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_deref(), v))
    }

    /// Layer this list over `defaults`: the defaults keep their positions,
    /// entries here win on key conflicts, and flags are appended.
    pub fn merge_over(&self, defaults: &OptionList) -> OptionList {
        let mut merged = defaults.clone();
        for (key, value) in &self.entries {
            match key {
                Some(key) => merged.set(key.clone(), value.clone()),
                None => merged.flag(value.clone()),
            }
        }
        merged
    }

    /// Encode the whole list; the top level is not brace-wrapped.
    pub fn encode(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(key, value)| match key {
                Some(key) => format!("{}={}", key, value.encode_token()),
                None => value.encode_token(),
            })
            .collect();
        parts.join(" ")
    }
}

impl fmt::Display for OptionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
