pub mod documents;
pub mod dto;
pub mod paths;
pub mod quota;

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub api_key: String,
    pub storage_bucket: String,
}

impl FirebaseConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let project_id = env::var("FIREBASE_PROJECT_ID")
            .map_err(|_| AppError::BadRequest("FIREBASE_PROJECT_ID is not set".to_string()))?;
        let api_key = env::var("FIREBASE_API_KEY")
            .map_err(|_| AppError::BadRequest("FIREBASE_API_KEY is not set".to_string()))?;
        let storage_bucket = env::var("FIREBASE_STORAGE_BUCKET")
            .map_err(|_| AppError::BadRequest("FIREBASE_STORAGE_BUCKET is not set".to_string()))?;

        Ok(Self {
            project_id,
            api_key,
            storage_bucket,
        })
    }
}

/// A typed field value as held client-side. `Int` and `Long` are kept
/// apart because the storage-quota estimator charges them differently.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i32),
    Long(i64),
    Bool(bool),
    Double(f64),
}

pub type Fields = BTreeMap<String, FieldValue>;

/// An untyped remote document: its store path plus a string-keyed field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub fields: Fields,
}

impl Document {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FieldValue::Int(v)) => Some(i64::from(*v)),
            Some(FieldValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get_i64(key).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.fields.get(key) {
            Some(FieldValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.fields.get(key) {
            Some(FieldValue::Double(v)) => Some(*v),
            Some(FieldValue::Int(v)) => Some(f64::from(*v)),
            Some(FieldValue::Long(v)) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Untyped document operations against the remote store. Writes are
/// last-writer-wins; there is no optimistic concurrency anywhere.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One collection-level read returning every direct child document.
    async fn list(&self, collection_path: &str) -> Result<Vec<Document>, AppError>;

    async fn get(&self, doc_path: &str) -> Result<Document, AppError>;

    /// Full-document overwrite.
    async fn set(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError>;

    /// Merge write: only the given fields are touched.
    async fn merge(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError>;

    /// Unconditional delete; deleting an absent document is not an error.
    async fn delete(&self, doc_path: &str) -> Result<(), AppError>;
}

fn to_rest(value: &FieldValue) -> dto::RestValue {
    match value {
        FieldValue::Str(s) => dto::RestValue::StringValue(s.clone()),
        FieldValue::Int(v) => dto::RestValue::IntegerValue(v.to_string()),
        FieldValue::Long(v) => dto::RestValue::IntegerValue(v.to_string()),
        FieldValue::Bool(v) => dto::RestValue::BooleanValue(*v),
        FieldValue::Double(v) => dto::RestValue::DoubleValue(*v),
    }
}

fn from_rest(value: &dto::RestValue) -> Result<FieldValue, AppError> {
    match value {
        dto::RestValue::StringValue(s) => Ok(FieldValue::Str(s.clone())),
        dto::RestValue::IntegerValue(s) => s
            .parse::<i64>()
            .map(FieldValue::Long)
            .map_err(|_| AppError::Remote(format!("Malformed integer value: {}", s))),
        dto::RestValue::DoubleValue(v) => Ok(FieldValue::Double(*v)),
        dto::RestValue::BooleanValue(v) => Ok(FieldValue::Bool(*v)),
    }
}

fn rest_fields(fields: &Fields) -> HashMap<String, dto::RestValue> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), to_rest(v)))
        .collect()
}

/// Render a field name for an `updateMask.fieldPaths` entry. The wire
/// grammar only accepts bare names matching `[A-Za-z_][A-Za-z0-9_]*`;
/// anything else (document ids with dashes, `USER-AVATAR`) must be
/// backtick-quoted, with backslashes and backticks escaped.
pub fn mask_field_path(key: &str) -> String {
    let mut chars = key.chars();
    let simple = match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    };

    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

pub struct FirestoreHttpClient {
    client: Client,
    config: FirebaseConfig,
}

impl FirestoreHttpClient {
    pub fn new(config: FirebaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn documents_root(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.config.project_id
        )
    }

    fn doc_url(&self, path: &str) -> String {
        format!("{}/{}", self.documents_root(), path)
    }

    /// Strip the resource prefix off a full document name, leaving the
    /// store-relative path used everywhere in this crate.
    fn relative_path(&self, name: &str) -> String {
        let root = format!(
            "projects/{}/databases/(default)/documents/",
            self.config.project_id
        );
        match name.find(&root) {
            Some(idx) => name[idx + root.len()..].to_string(),
            None => name.to_string(),
        }
    }

    fn into_document(&self, rest: dto::RestDocument) -> Result<Document, AppError> {
        let path = rest
            .name
            .as_deref()
            .map(|n| self.relative_path(n))
            .unwrap_or_default();
        let mut fields = Fields::new();
        for (key, value) in &rest.fields {
            fields.insert(key.clone(), from_rest(value)?);
        }
        Ok(Document { path, fields })
    }
}

#[async_trait]
impl DocumentStore for FirestoreHttpClient {
    async fn list(&self, collection_path: &str) -> Result<Vec<Document>, AppError> {
        let url = self.doc_url(collection_path);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.config.api_key.as_str()), ("pageSize", "300")])
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Firestore list error {}: {}",
                status, body
            )));
        }

        let parsed: dto::ListDocumentsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse list response: {}", e)))?;

        if parsed.next_page_token.is_some() {
            warn!("collection {} exceeds one page; extra documents ignored", collection_path);
        }

        parsed
            .documents
            .into_iter()
            .map(|d| self.into_document(d))
            .collect()
    }

    async fn get(&self, doc_path: &str) -> Result<Document, AppError> {
        let url = self.doc_url(doc_path);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Firestore get error {}: {}",
                status, body
            )));
        }

        let parsed: dto::RestDocument = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse document: {}", e)))?;

        self.into_document(parsed)
    }

    async fn set(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError> {
        let url = self.doc_url(doc_path);
        let body = dto::RestDocument {
            name: None,
            fields: rest_fields(fields),
        };

        // PATCH without an update mask replaces the whole document.
        let response = self
            .client
            .patch(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Firestore set error {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn merge(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError> {
        let url = self.doc_url(doc_path);
        let body = dto::RestDocument {
            name: None,
            fields: rest_fields(fields),
        };

        let mut query: Vec<(&str, String)> = vec![("key", self.config.api_key.clone())];
        for key in fields.keys() {
            query.push(("updateMask.fieldPaths", mask_field_path(key)));
        }

        let response = self
            .client
            .patch(&url)
            .query(&query)
            .json(&body)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Firestore merge error {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn delete(&self, doc_path: &str) -> Result<(), AppError> {
        let url = self.doc_url(doc_path);

        // Firestore answers OK for already-deleted documents, which is
        // exactly the idempotence the callers rely on.
        let response = self
            .client
            .delete(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Firestore delete error {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// In-process store used by tests and offline runs.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection_path: &str) -> Result<Vec<Document>, AppError> {
        let prefix = format!("{}/", collection_path);
        let docs = self.docs.read().expect("memory store lock poisoned");
        let mut out: Vec<Document> = docs
            .iter()
            .filter(|(path, _)| {
                path.starts_with(&prefix) && !path[prefix.len()..].contains('/')
            })
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn get(&self, doc_path: &str) -> Result<Document, AppError> {
        let docs = self.docs.read().expect("memory store lock poisoned");
        docs.get(doc_path)
            .map(|fields| Document {
                path: doc_path.to_string(),
                fields: fields.clone(),
            })
            .ok_or(AppError::NotFound)
    }

    async fn set(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError> {
        let mut docs = self.docs.write().expect("memory store lock poisoned");
        docs.insert(doc_path.to_string(), fields.clone());
        Ok(())
    }

    async fn merge(&self, doc_path: &str, fields: &Fields) -> Result<(), AppError> {
        let mut docs = self.docs.write().expect("memory store lock poisoned");
        let entry = docs.entry(doc_path.to_string()).or_default();
        for (key, value) in fields {
            entry.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, doc_path: &str) -> Result<(), AppError> {
        let mut docs = self.docs.write().expect("memory store lock poisoned");
        docs.remove(doc_path);
        Ok(())
    }
}
