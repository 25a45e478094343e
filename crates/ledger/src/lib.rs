//! Personal-finance transaction ledger and balance-reconciliation core.
//!
//! The [`Ledger`] facade is the single entry point: it sequences store
//! mutations through the worker context, keeps the per-owner base-balance
//! cells in step, and fires the change-notification bus after every
//! successful mutation. Reads degrade to safe defaults (`0.0`, empty
//! sequence, absent) instead of surfacing storage failures; writes report
//! their error to the caller and are never retried here.

use std::path::PathBuf;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::watch;

pub use balance::{BalanceCache, BaseBalance, LocalBalanceFile, MANUAL_EDIT_GUARD_MS};
pub use context::{Context, Dispatcher};
pub use documents::{
    BALANCE_FIELD, BalanceDocuments, Document, HttpDocuments, MemoryDocuments, MergeMode,
    document_number,
};
pub use error::LedgerError;
pub use extract::extract_amount;
pub use ingest::{MessageIngestor, normalize_sender};
pub use notify::{ChangeListener, ChangeNotifier};
pub use owner::Owner;
pub use period::{current_month, month_bounds};
pub use store::LedgerStore;
pub use transactions::{CategoryTotal, TransactionKind, TransactionRecord};

mod balance;
mod context;
mod documents;
mod error;
mod extract;
mod ingest;
mod notify;
mod owner;
mod period;
mod store;
mod transactions;

type ResultLedger<T> = Result<T, LedgerError>;

pub struct Ledger {
    store: Arc<LedgerStore>,
    cache: Arc<BalanceCache>,
    notifier: ChangeNotifier,
    dispatcher: Dispatcher,
    ingestor: MessageIngestor,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    /// Appends a record, fires the notification bus, and returns the
    /// store-assigned id.
    pub async fn insert(&self, record: TransactionRecord) -> ResultLedger<i64> {
        let store = self.store.clone();
        let id = self
            .dispatcher
            .worker
            .run(async move { store.insert(&record).await })
            .await??;
        self.notifier.publish();
        Ok(id)
    }

    /// All records for an owner, newest first. Degrades to an empty list on
    /// storage failure.
    pub async fn list_by_owner(&self, owner: &Owner) -> Vec<TransactionRecord> {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("list_by_owner", Vec::new(), async move {
            store.list_by_owner(&owner).await
        })
        .await
    }

    /// The `limit` newest records for an owner.
    pub async fn newest(&self, owner: &Owner, limit: u64) -> Vec<TransactionRecord> {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("newest", Vec::new(), async move {
            store.newest(&owner, limit).await
        })
        .await
    }

    pub async fn sum_income(&self, owner: &Owner, from: i64, to: i64) -> f64 {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("sum_income", 0.0, async move {
            store.sum_income_in_range(&owner, from, to).await
        })
        .await
    }

    pub async fn sum_expense(&self, owner: &Owner, from: i64, to: i64) -> f64 {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("sum_expense", 0.0, async move {
            store.sum_expense_in_range(&owner, from, to).await
        })
        .await
    }

    pub async fn sum_all(&self, owner: &Owner, from: i64, to: i64) -> f64 {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("sum_all", 0.0, async move {
            store.sum_all_in_range(&owner, from, to).await
        })
        .await
    }

    /// Category breakdown over `[from, to]`, total descending.
    pub async fn category_totals(&self, owner: &Owner, from: i64, to: i64) -> Vec<CategoryTotal> {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("category_totals", Vec::new(), async move {
            store.category_totals_in_range(&owner, from, to).await
        })
        .await
    }

    pub async fn earliest_timestamp(&self, owner: &Owner) -> Option<i64> {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("earliest_timestamp", None, async move {
            store.earliest_timestamp(&owner).await
        })
        .await
    }

    /// Looks a record up by its exact `(owner, timestamp, amount)` triple.
    pub async fn find_matching(
        &self,
        owner: &Owner,
        timestamp: i64,
        amount: f64,
    ) -> Option<TransactionRecord> {
        let store = self.store.clone();
        let owner = owner.clone();
        self.read_or("find_matching", None, async move {
            store.find_matching(&owner, timestamp, amount).await
        })
        .await
    }

    /// Folds one owner's history into another, firing the notification bus.
    /// Returns the number of rows moved; running it again once nothing
    /// matches is a no-op.
    pub async fn rewrite_owner(&self, old: &Owner, new: &Owner) -> ResultLedger<u64> {
        let store = self.store.clone();
        let old = old.clone();
        let new = new.clone();
        let moved = self
            .dispatcher
            .worker
            .run(async move { store.rewrite_owner(&old, &new).await })
            .await??;
        self.notifier.publish();
        Ok(moved)
    }

    /// Deletes one record by id. `compensating_amount` is accepted for
    /// caller symmetry but never applied: the base balance is independent of
    /// transaction history, so only derived period sums change.
    pub async fn delete(
        &self,
        id: i64,
        owner: &Owner,
        compensating_amount: f64,
    ) -> ResultLedger<()> {
        tracing::debug!(
            id,
            owner = %owner,
            compensating_amount,
            "deleting transaction; base balance is left untouched"
        );
        let store = self.store.clone();
        let affected = self
            .dispatcher
            .worker
            .run(async move { store.delete_by_id(id).await })
            .await??;
        if affected == 0 {
            return Err(LedgerError::NotFound(format!("transaction {id}")));
        }
        self.notifier.publish();
        Ok(())
    }

    /// The observable base-balance cell for an owner, created (and fetched
    /// from persisted storage) on first access.
    pub fn observe_balance(&self, owner: &Owner) -> watch::Receiver<BaseBalance> {
        self.cache.observe(owner)
    }

    /// Sets the base balance in-memory, synchronously visible to all
    /// observers, and fires the notification bus so derived sums refresh.
    /// Does not persist; see [`edit_displayed_balance`](Self::edit_displayed_balance).
    pub fn set_manual_balance(&self, owner: &Owner, value: f64) {
        self.cache.set_manual(owner, value);
        self.notifier.publish();
    }

    /// One-shot read of the persisted base balance, bypassing the cache.
    pub async fn fetch_persisted_balance(&self, owner: &Owner) -> f64 {
        self.cache.fetch_persisted(owner).await
    }

    /// Whether the owner's base balance was manually edited less than
    /// `threshold_ms` ago. Callers about to overwrite the cell from a
    /// slower source use this to decide whether to skip the overwrite.
    pub fn is_recently_manual(&self, owner: &Owner, threshold_ms: i64) -> bool {
        self.cache.is_recently_manual(owner, threshold_ms)
    }

    /// Applies the common UI action "set my visible balance to
    /// `entered_total`" for the period `[from, to]`: back-solves the base as
    /// `entered_total - period sum`, updates the cell, persists the base
    /// (not the displayed total), and fires the notification bus. Returns
    /// the new base value.
    pub async fn edit_displayed_balance(
        &self,
        owner: &Owner,
        entered_total: f64,
        from: i64,
        to: i64,
    ) -> ResultLedger<f64> {
        let period_sum = self.sum_all(owner, from, to).await;
        let base = entered_total - period_sum;
        self.cache.set_manual(owner, base);
        self.cache.persist(owner, base).await?;
        self.notifier.publish();
        Ok(base)
    }

    /// The §3 identity as a convenience read: cell value plus period sum.
    pub async fn displayed_balance(&self, owner: &Owner, from: i64, to: i64) -> f64 {
        let base = self.cache.observe(owner).borrow().value;
        base + self.sum_all(owner, from, to).await
    }

    /// Runs a message through the ingestion heuristic and records the
    /// drafted expense, if any. `Ok(None)` means the message was ignored
    /// (unknown sender, or no unambiguous amount).
    pub async fn ingest_message(
        &self,
        owner: &Owner,
        sender: &str,
        body: &str,
    ) -> ResultLedger<Option<i64>> {
        let Some(record) = self.ingestor.draft(owner, sender, body) else {
            return Ok(None);
        };
        let id = self.insert(record).await?;
        Ok(Some(id))
    }

    pub fn subscribe(&self, listener: ChangeListener) {
        self.notifier.subscribe(listener);
    }

    pub fn unsubscribe(&self, listener: &ChangeListener) {
        self.notifier.unsubscribe(listener);
    }

    /// The worker/main contexts, mainly for callers that need to fence
    /// against in-flight work.
    pub fn contexts(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Funnels a store read through the worker context, degrading to
    /// `default` with a warning instead of surfacing the failure.
    async fn read_or<T, F>(&self, what: &'static str, default: T, fut: F) -> T
    where
        T: Send + 'static,
        F: std::future::Future<Output = ResultLedger<T>> + Send + 'static,
    {
        match self.dispatcher.worker.run(fut).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) | Err(err) => {
                tracing::warn!("{what} failed, degrading to default: {err}");
                default
            }
        }
    }
}

pub struct LedgerBuilder {
    database: Option<DatabaseConnection>,
    documents: Option<Arc<dyn BalanceDocuments>>,
    local_balance: PathBuf,
    allowed_senders: Vec<String>,
}

impl Default for LedgerBuilder {
    fn default() -> Self {
        Self {
            database: None,
            documents: None,
            local_balance: PathBuf::from("balance.json"),
            allowed_senders: Vec::new(),
        }
    }
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = Some(db);
        self
    }

    /// Remote balance-document store for authenticated owners. Defaults to
    /// an in-memory store.
    pub fn documents(mut self, documents: Arc<dyn BalanceDocuments>) -> LedgerBuilder {
        self.documents = Some(documents);
        self
    }

    /// Path of the local fallback balance file.
    pub fn local_balance(mut self, path: impl Into<PathBuf>) -> LedgerBuilder {
        self.local_balance = path.into();
        self
    }

    /// Sender identifiers the message-ingestion path will accept.
    pub fn allowed_senders(mut self, senders: Vec<String>) -> LedgerBuilder {
        self.allowed_senders = senders;
        self
    }

    /// Construct `Ledger`
    pub async fn build(self) -> ResultLedger<Ledger> {
        let db = self
            .database
            .ok_or_else(|| LedgerError::Storage("builder is missing a database".to_string()))?;
        db.ping().await?;

        let dispatcher = Dispatcher::new();
        let documents = self
            .documents
            .unwrap_or_else(|| Arc::new(MemoryDocuments::default()));
        let cache = Arc::new(BalanceCache::new(
            documents,
            LocalBalanceFile::new(self.local_balance),
            dispatcher.main.clone(),
        ));

        Ok(Ledger {
            store: Arc::new(LedgerStore::new(db)),
            cache,
            notifier: ChangeNotifier::new(dispatcher.main.clone()),
            dispatcher,
            ingestor: MessageIngestor::new(self.allowed_senders),
        })
    }
}
