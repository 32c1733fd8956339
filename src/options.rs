//! Tag option parsing
//!
//! Tags receive their arguments as raw `name=value` tokens. This module turns
//! those tokens into [`QueryOptions`], applies the legacy parameter names and
//! narrows the options down to the parameters a remote call accepts.

use serde_json::Value;
use std::collections::BTreeMap;

/// Legacy parameter names, as `(current, legacy)` pairs.
pub const LEGACY_ALIASES: [(&str, &str); 3] = [
    ("start_date", "since"),
    ("end_date", "until"),
    ("sub_grouping", "subgrouping"),
];

/// Parameters accepted by the summary report when rendered as a listing.
pub const SUMMARY_LISTING_PARAMS: &[&str] = &[
    "user_agent",
    "workspace_id",
    "grouping",
    "sub_grouping",
    "start_date",
    "end_date",
    "user_ids",
];

/// Parameters accepted by the summary report when summed up to hours.
pub const SUMMARY_HOURS_PARAMS: &[&str] = &[
    "user_agent",
    "workspace_id",
    "grouping",
    "sub_grouping",
    "start_date",
    "end_date",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    /// A bare token without `=`.
    Flag,
    IdList(Vec<i64>),
}

impl OptionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            OptionValue::Text(text) => Value::String(text.clone()),
            OptionValue::Flag => Value::Bool(true),
            OptionValue::IdList(ids) => Value::Array(ids.iter().map(|id| Value::from(*id)).collect()),
        }
    }
}

/// Parameters of a remote call, ordered by name so that serializing them is
/// independent of the order the tokens were written in.
pub type ResolvedParams = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    values: BTreeMap<String, OptionValue>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(OptionValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }

    /// Copy legacy parameter values to their current names. A value already
    /// present under the current name wins.
    pub fn apply_aliases(&mut self) {
        for (current, legacy) in LEGACY_ALIASES {
            if self.values.contains_key(current) {
                continue;
            }
            if let Some(value) = self.values.get(legacy).cloned() {
                self.values.insert(current.to_string(), value);
            }
        }
    }

    /// Turn a comma separated text option into a list of integer ids.
    pub fn parse_id_list(&mut self, key: &str) {
        if let Some(OptionValue::Text(raw)) = self.values.get(key) {
            let ids = raw.split(',').map(parse_leading_int).collect();
            self.values.insert(key.to_string(), OptionValue::IdList(ids));
        }
    }

    /// Keep only the allowed parameters, converted to JSON values.
    pub fn resolve(&self, allowed: &[&str]) -> ResolvedParams {
        self.values
            .iter()
            .filter(|(key, _)| allowed.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }

    /// All options as query parameters for a resource call.
    pub fn to_params(&self) -> ResolvedParams {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }
}

/// Parse raw tag tokens into options.
///
/// `name=value` is split on the first `=` and both sides are trimmed; a token
/// without `=` becomes a flag.
pub fn extract_options<I, S>(tokens: I) -> QueryOptions
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = QueryOptions::new();
    for token in tokens {
        let token = token.as_ref();
        match token.split_once('=') {
            Some((name, value)) => {
                options.insert(name.trim(), OptionValue::Text(value.trim().to_string()));
            }
            None => {
                let name = token.trim();
                if !name.is_empty() {
                    options.insert(name, OptionValue::Flag);
                }
            }
        }
    }
    options
}

/// Integer prefix of a string, 0 when there is none.
fn parse_leading_int(raw: &str) -> i64 {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}
