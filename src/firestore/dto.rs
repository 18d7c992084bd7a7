use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire shape of a Firestore REST document.
#[derive(Debug, Serialize, Deserialize)]
pub struct RestDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, RestValue>,
}

/// Firestore typed value wrapper, e.g. `{"stringValue": "..."}`.
/// 64-bit integers travel as decimal strings on this API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestValue {
    StringValue(String),
    IntegerValue(String),
    DoubleValue(f64),
    BooleanValue(bool),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<RestDocument>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
