//! Durable transaction table and its aggregate queries.
//!
//! The store is intentionally thin: it enforces no business rules, and every
//! aggregate read collapses "no matching rows" to a safe default instead of
//! an error. Serialization of concurrent access is not handled here; the
//! facade funnels every call through the worker context.

use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Statement, prelude::*};
use sea_orm::sea_query::Expr;

use crate::transactions::{self, CategoryTotal, TransactionRecord};
use crate::{Owner, ResultLedger};

#[derive(Clone, Debug)]
pub struct LedgerStore {
    db: DatabaseConnection,
}

impl LedgerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a row and returns the store-assigned id. `record.id` is
    /// ignored.
    pub async fn insert(&self, record: &TransactionRecord) -> ResultLedger<i64> {
        let model = transactions::ActiveModel::from(record)
            .insert(&self.db)
            .await?;
        Ok(model.id)
    }

    /// All rows for an owner, newest timestamp first.
    pub async fn list_by_owner(&self, owner: &Owner) -> ResultLedger<Vec<TransactionRecord>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(owner.storage_id()))
            .order_by_desc(transactions::Column::Timestamp)
            .order_by_desc(transactions::Column::Id)
            .all(&self.db)
            .await?;

        models.into_iter().map(TransactionRecord::try_from).collect()
    }

    /// The `limit` newest rows for an owner.
    pub async fn newest(&self, owner: &Owner, limit: u64) -> ResultLedger<Vec<TransactionRecord>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(owner.storage_id()))
            .order_by_desc(transactions::Column::Timestamp)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        models.into_iter().map(TransactionRecord::try_from).collect()
    }

    /// Sum of strictly positive amounts in `[from, to]`, or `0.0`.
    pub async fn sum_income_in_range(
        &self,
        owner: &Owner,
        from: i64,
        to: i64,
    ) -> ResultLedger<f64> {
        self.sum_in_range(owner, from, to, Some("AND amount > 0"))
            .await
    }

    /// Sum of strictly negative amounts in `[from, to]`, or `0.0`.
    pub async fn sum_expense_in_range(
        &self,
        owner: &Owner,
        from: i64,
        to: i64,
    ) -> ResultLedger<f64> {
        self.sum_in_range(owner, from, to, Some("AND amount < 0"))
            .await
    }

    /// Unrestricted sign sum over `[from, to]`, or `0.0`.
    pub async fn sum_all_in_range(&self, owner: &Owner, from: i64, to: i64) -> ResultLedger<f64> {
        self.sum_in_range(owner, from, to, None).await
    }

    async fn sum_in_range(
        &self,
        owner: &Owner,
        from: i64,
        to: i64,
        sign_cond: Option<&str>,
    ) -> ResultLedger<f64> {
        let backend = self.db.get_database_backend();
        let sign_cond = sign_cond.unwrap_or("");
        let stmt = Statement::from_sql_and_values(
            backend,
            format!(
                "SELECT COALESCE(SUM(amount), 0.0) AS sum \
                 FROM transactions \
                 WHERE owner_id = ? AND timestamp >= ? AND timestamp <= ? {sign_cond}"
            ),
            vec![owner.storage_id().into(), from.into(), to.into()],
        );
        let row = self.db.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0.0))
    }

    /// One row per distinct category in `[from, to]`, total descending.
    /// Callers may re-sort.
    pub async fn category_totals_in_range(
        &self,
        owner: &Owner,
        from: i64,
        to: i64,
    ) -> ResultLedger<Vec<CategoryTotal>> {
        let backend = self.db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT category AS category, SUM(amount) AS total \
             FROM transactions \
             WHERE owner_id = ? AND timestamp >= ? AND timestamp <= ? \
             GROUP BY category ORDER BY total DESC",
            vec![owner.storage_id().into(), from.into(), to.into()],
        );
        let rows = self.db.query_all(stmt).await?;

        let mut totals = Vec::with_capacity(rows.len());
        for row in rows {
            totals.push(CategoryTotal {
                category: row.try_get("", "category")?,
                total: row.try_get("", "total")?,
            });
        }
        Ok(totals)
    }

    /// Timestamp of the owner's oldest row, or `None` when the owner has no
    /// rows.
    pub async fn earliest_timestamp(&self, owner: &Owner) -> ResultLedger<Option<i64>> {
        let backend = self.db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT MIN(timestamp) AS earliest FROM transactions WHERE owner_id = ?",
            vec![owner.storage_id().into()],
        );
        let row = self.db.query_one(stmt).await?;
        Ok(row
            .and_then(|r| r.try_get::<Option<i64>>("", "earliest").ok())
            .flatten())
    }

    /// Bulk-moves every row from one owner to another and returns the number
    /// of rows touched. A second run with no matching rows is a no-op.
    pub async fn rewrite_owner(&self, old: &Owner, new: &Owner) -> ResultLedger<u64> {
        let result = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::OwnerId,
                Expr::value(new.storage_id()),
            )
            .filter(transactions::Column::OwnerId.eq(old.storage_id()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes one row by id, returning the number of rows affected. A
    /// missing id yields `0`, never an error; the facade decides whether
    /// that counts as a failure.
    pub async fn delete_by_id(&self, id: i64) -> ResultLedger<u64> {
        let result = transactions::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    /// Looks a row up by its exact `(owner, timestamp, amount)` triple, as
    /// the delete flow identifies rows.
    pub async fn find_matching(
        &self,
        owner: &Owner,
        timestamp: i64,
        amount: f64,
    ) -> ResultLedger<Option<TransactionRecord>> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(owner.storage_id()))
            .filter(transactions::Column::Timestamp.eq(timestamp))
            .filter(transactions::Column::Amount.eq(amount))
            .one(&self.db)
            .await?;

        model.map(TransactionRecord::try_from).transpose()
    }
}
