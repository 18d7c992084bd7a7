use serde::{Deserialize, Serialize};

/// A typed preference value: the local store and its remote mirror only
/// ever hold booleans, strings and integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PreferenceValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PreferenceValue::Bool(_) => "bool",
            PreferenceValue::Int(_) => "int",
            PreferenceValue::Str(_) => "str",
        }
    }

    pub fn encode(&self) -> String {
        match self {
            PreferenceValue::Bool(v) => v.to_string(),
            PreferenceValue::Int(v) => v.to_string(),
            PreferenceValue::Str(v) => v.clone(),
        }
    }

    /// Rebuild a value from its persisted (kind, text) form. Rows written
    /// by this crate always decode; an unknown kind falls back to a string.
    pub fn decode(kind: &str, value: &str) -> Self {
        match kind {
            "bool" => PreferenceValue::Bool(value == "true"),
            "int" => value
                .parse::<i64>()
                .map(PreferenceValue::Int)
                .unwrap_or_else(|_| PreferenceValue::Str(value.to_string())),
            _ => PreferenceValue::Str(value.to_string()),
        }
    }
}

impl From<bool> for PreferenceValue {
    fn from(v: bool) -> Self {
        PreferenceValue::Bool(v)
    }
}

impl From<i64> for PreferenceValue {
    fn from(v: i64) -> Self {
        PreferenceValue::Int(v)
    }
}

impl From<&str> for PreferenceValue {
    fn from(v: &str) -> Self {
        PreferenceValue::Str(v.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(v: String) -> Self {
        PreferenceValue::Str(v)
    }
}
