//! Per-owner base-balance cells and their reconciliation.
//!
//! The base balance is independent of transaction history: displayed balance
//! for a period is always `cell value + period sum`. Each owner gets one
//! observable cell, created lazily and kept for the process lifetime. A
//! manual edit wins over any slower fetch that resolves within the guard
//! window, so a lagging remote read can never clobber a value the user just
//! typed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::json;
use tokio::sync::watch;

use crate::context::Context;
use crate::documents::{BALANCE_FIELD, BalanceDocuments, Document, MergeMode, document_number};
use crate::{LedgerError, Owner, ResultLedger};

/// How long after a manual edit a slower fetch result is discarded.
pub const MANUAL_EDIT_GUARD_MS: i64 = 5000;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BaseBalance {
    pub value: f64,
    /// Milliseconds since epoch of the latest manual edit, if any.
    pub last_manual_edit_at: Option<i64>,
}

/// Fallback storage for the anonymous owner: a JSON file holding
/// `{"balance": <number>}`. A missing or unreadable file reads as `0.0`.
#[derive(Clone, Debug)]
pub struct LocalBalanceFile {
    path: PathBuf,
}

impl LocalBalanceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn read(&self) -> f64 {
        let Ok(bytes) = tokio::fs::read(&self.path).await else {
            return 0.0;
        };
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            return 0.0;
        };
        value
            .as_object()
            .map(|doc| document_number(doc, BALANCE_FIELD))
            .unwrap_or(0.0)
    }

    pub async fn write(&self, value: f64) -> ResultLedger<()> {
        let doc = json!({ "balance": value });
        let bytes = serde_json::to_vec(&doc).map_err(|err| LedgerError::Storage(err.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|err| LedgerError::Storage(err.to_string()))
    }
}

pub struct BalanceCache {
    cells: Mutex<HashMap<String, watch::Sender<BaseBalance>>>,
    documents: Arc<dyn BalanceDocuments>,
    local: LocalBalanceFile,
    main: Context,
}

impl BalanceCache {
    pub fn new(
        documents: Arc<dyn BalanceDocuments>,
        local: LocalBalanceFile,
        main: Context,
    ) -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            documents,
            local,
            main,
        }
    }

    /// The cell for an owner, creating it if absent. First creation kicks
    /// off an asynchronous fetch from the owner's persisted storage; the
    /// fetched value is applied on the main context unless a manual edit
    /// landed inside the guard window in the meantime.
    pub fn observe(&self, owner: &Owner) -> watch::Receiver<BaseBalance> {
        let (sender, created) = self.cell(owner);
        if created {
            self.start_initial_fetch(owner, sender.clone());
        }
        sender.subscribe()
    }

    /// Immediately sets the cell's value and stamps the manual-edit time.
    /// Visible to every observer synchronously; persistence is the caller's
    /// job.
    pub fn set_manual(&self, owner: &Owner, value: f64) {
        let (sender, _) = self.cell(owner);
        sender.send_replace(BaseBalance {
            value,
            last_manual_edit_at: Some(Utc::now().timestamp_millis()),
        });
    }

    /// Whether the owner's cell was manually edited less than
    /// `threshold_ms` ago.
    pub fn is_recently_manual(&self, owner: &Owner, threshold_ms: i64) -> bool {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = cells.get(owner.storage_id()) else {
            return false;
        };
        let now = Utc::now().timestamp_millis();
        sender
            .borrow()
            .last_manual_edit_at
            .is_some_and(|at| now - at < threshold_ms)
    }

    /// One-shot read of the persisted balance, bypassing the cache: the
    /// local fallback file for the anonymous owner, the remote document
    /// otherwise. A missing or unreachable remote balance reads as `0.0`.
    pub async fn fetch_persisted(&self, owner: &Owner) -> f64 {
        fetch_persisted(self.documents.as_ref(), &self.local, owner).await
    }

    /// Persists a base value: remote document (merge) for authenticated
    /// owners, the local file for the anonymous owner. A failed remote
    /// write falls back to the local file so the value survives the outage.
    pub async fn persist(&self, owner: &Owner, value: f64) -> ResultLedger<()> {
        match owner {
            Owner::Anonymous => self.local.write(value).await,
            Owner::Authenticated(id) => {
                let mut doc = Document::new();
                doc.insert(BALANCE_FIELD.to_string(), json!(value));
                match self.documents.set(id, doc, MergeMode::Merge).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        tracing::warn!(owner = %owner, "remote balance write failed, keeping local copy: {err}");
                        self.local.write(value).await
                    }
                }
            }
        }
    }

    fn cell(&self, owner: &Owner) -> (watch::Sender<BaseBalance>, bool) {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        match cells.get(owner.storage_id()) {
            Some(sender) => (sender.clone(), false),
            None => {
                let (sender, _) = watch::channel(BaseBalance::default());
                cells.insert(owner.storage_id().to_string(), sender.clone());
                (sender, true)
            }
        }
    }

    fn start_initial_fetch(&self, owner: &Owner, sender: watch::Sender<BaseBalance>) {
        let documents = self.documents.clone();
        let local = self.local.clone();
        let main = self.main.clone();
        let owner = owner.clone();
        tokio::spawn(async move {
            let fetched = fetch_persisted(documents.as_ref(), &local, &owner).await;
            main.submit(async move {
                let now = Utc::now().timestamp_millis();
                if !apply_fetched(&sender, fetched, now, MANUAL_EDIT_GUARD_MS) {
                    tracing::debug!(
                        owner = %owner,
                        "discarding fetched balance inside manual-edit guard window"
                    );
                }
            });
        });
    }
}

async fn fetch_persisted(
    documents: &dyn BalanceDocuments,
    local: &LocalBalanceFile,
    owner: &Owner,
) -> f64 {
    match owner {
        Owner::Anonymous => local.read().await,
        Owner::Authenticated(id) => match documents.get(id).await {
            Ok(Some(doc)) => document_number(&doc, BALANCE_FIELD),
            Ok(None) => 0.0,
            Err(err) => {
                tracing::warn!(owner = %owner, "remote balance fetch failed, treating as unset: {err}");
                0.0
            }
        },
    }
}

/// Applies a fetched value to a cell unless a manual edit happened inside
/// the guard window, checked against `now_ms` at apply time. Returns whether
/// the value was applied.
fn apply_fetched(
    sender: &watch::Sender<BaseBalance>,
    fetched: f64,
    now_ms: i64,
    guard_ms: i64,
) -> bool {
    let manual_at = sender.borrow().last_manual_edit_at;
    if manual_at.is_some_and(|at| now_ms - at < guard_ms) {
        return false;
    }
    sender.send_modify(|balance| balance.value = fetched);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_inside_guard_window_is_discarded() {
        let (sender, _rx) = watch::channel(BaseBalance {
            value: 7.0,
            last_manual_edit_at: Some(10_000),
        });

        let applied = apply_fetched(&sender, 999.0, 12_000, MANUAL_EDIT_GUARD_MS);

        assert!(!applied);
        assert_eq!(sender.borrow().value, 7.0);
    }

    #[test]
    fn fetch_after_guard_window_applies() {
        let (sender, _rx) = watch::channel(BaseBalance {
            value: 7.0,
            last_manual_edit_at: Some(10_000),
        });

        let applied = apply_fetched(&sender, 999.0, 15_000, MANUAL_EDIT_GUARD_MS);

        assert!(applied);
        assert_eq!(sender.borrow().value, 999.0);
        // The manual-edit stamp survives; only the value is overwritten.
        assert_eq!(sender.borrow().last_manual_edit_at, Some(10_000));
    }

    #[test]
    fn fetch_with_no_manual_edit_applies() {
        let (sender, _rx) = watch::channel(BaseBalance::default());

        assert!(apply_fetched(&sender, 250.0, 1_000, MANUAL_EDIT_GUARD_MS));
        assert_eq!(sender.borrow().value, 250.0);
    }

    #[test]
    fn guard_window_boundary_is_exclusive() {
        let (sender, _rx) = watch::channel(BaseBalance {
            value: 7.0,
            last_manual_edit_at: Some(10_000),
        });

        // Exactly guard_ms later the edit no longer protects the cell.
        assert!(apply_fetched(
            &sender,
            999.0,
            10_000 + MANUAL_EDIT_GUARD_MS,
            MANUAL_EDIT_GUARD_MS
        ));
    }
}
