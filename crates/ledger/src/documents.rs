//! Document-style remote store for per-owner balance documents.
//!
//! The remote schema is a single JSON object per owner; the only field this
//! core reads is `"balance"`. A missing document or an unreachable backend
//! is treated as "balance not yet set" by the callers in `balance.rs`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::{LedgerError, ResultLedger};

pub type Document = serde_json::Map<String, Value>;

pub const BALANCE_FIELD: &str = "balance";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Overlay the given fields onto the existing document.
    Merge,
    /// Replace the whole document.
    Replace,
}

#[async_trait]
pub trait BalanceDocuments: Send + Sync {
    async fn get(&self, owner_id: &str) -> ResultLedger<Option<Document>>;
    async fn set(&self, owner_id: &str, doc: Document, mode: MergeMode) -> ResultLedger<()>;
}

/// Reads a numeric field from a document the forgiving way: plain numbers
/// pass through, numeric strings are stripped of currency garbage, and
/// anything else reads as `0.0`.
pub fn document_number(doc: &Document, field: &str) -> f64 {
    match doc.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// In-memory document store. Also the base for test doubles.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    inner: Mutex<HashMap<String, Document>>,
}

#[async_trait]
impl BalanceDocuments for MemoryDocuments {
    async fn get(&self, owner_id: &str) -> ResultLedger<Option<Document>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.get(owner_id).cloned())
    }

    async fn set(&self, owner_id: &str, doc: Document, mode: MergeMode) -> ResultLedger<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match mode {
            MergeMode::Replace => {
                inner.insert(owner_id.to_string(), doc);
            }
            MergeMode::Merge => {
                let existing = inner.entry(owner_id.to_string()).or_default();
                for (key, value) in doc {
                    existing.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

/// HTTP-backed document store: `GET/PATCH/PUT {base_url}owners/{id}/balance`.
#[derive(Clone, Debug)]
pub struct HttpDocuments {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpDocuments {
    pub fn new(base_url: &str) -> ResultLedger<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| LedgerError::RemoteUnavailable(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, owner_id: &str) -> ResultLedger<Url> {
        self.base_url
            .join(&format!("owners/{owner_id}/balance"))
            .map_err(|err| LedgerError::RemoteUnavailable(format!("invalid base_url: {err}")))
    }
}

#[async_trait]
impl BalanceDocuments for HttpDocuments {
    async fn get(&self, owner_id: &str) -> ResultLedger<Option<Document>> {
        let endpoint = self.endpoint(owner_id)?;
        let res = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(|err| LedgerError::RemoteUnavailable(err.to_string()))?;

        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => res
                .json::<Document>()
                .await
                .map(Some)
                .map_err(|err| LedgerError::RemoteUnavailable(err.to_string())),
            status => Err(LedgerError::RemoteUnavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }

    async fn set(&self, owner_id: &str, doc: Document, mode: MergeMode) -> ResultLedger<()> {
        let endpoint = self.endpoint(owner_id)?;
        let request = match mode {
            MergeMode::Merge => self.http.patch(endpoint),
            MergeMode::Replace => self.http.put(endpoint),
        };
        let res = request
            .json(&doc)
            .send()
            .await
            .map_err(|err| LedgerError::RemoteUnavailable(err.to_string()))?;

        if res.status().is_success() {
            Ok(())
        } else {
            Err(LedgerError::RemoteUnavailable(format!(
                "unexpected status {}",
                res.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        let mut doc = Document::new();
        doc.insert(BALANCE_FIELD.to_string(), value);
        doc
    }

    #[test]
    fn plain_numbers_pass_through() {
        assert_eq!(document_number(&doc(json!(1_500_000.0)), BALANCE_FIELD), 1_500_000.0);
        assert_eq!(document_number(&doc(json!(-250)), BALANCE_FIELD), -250.0);
    }

    #[test]
    fn numeric_strings_are_cleaned() {
        assert_eq!(document_number(&doc(json!("1,234,567 VND")), BALANCE_FIELD), 1_234_567.0);
        assert_eq!(document_number(&doc(json!("-42.5")), BALANCE_FIELD), -42.5);
    }

    #[test]
    fn garbage_reads_as_zero() {
        assert_eq!(document_number(&doc(json!("abc")), BALANCE_FIELD), 0.0);
        assert_eq!(document_number(&doc(json!(null)), BALANCE_FIELD), 0.0);
        assert_eq!(document_number(&Document::new(), BALANCE_FIELD), 0.0);
    }

    #[tokio::test]
    async fn memory_merge_keeps_unrelated_fields() {
        let store = MemoryDocuments::default();
        let mut first = Document::new();
        first.insert("balance".to_string(), json!(10.0));
        first.insert("label".to_string(), json!("main"));
        store.set("alice", first, MergeMode::Replace).await.unwrap();

        store
            .set("alice", doc(json!(20.0)), MergeMode::Merge)
            .await
            .unwrap();

        let stored = store.get("alice").await.unwrap().unwrap();
        assert_eq!(document_number(&stored, BALANCE_FIELD), 20.0);
        assert_eq!(stored.get("label"), Some(&json!("main")));
    }
}
