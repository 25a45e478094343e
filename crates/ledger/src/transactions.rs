//! Transaction primitives.
//!
//! A `TransactionRecord` is one dated ledger entry owned by an [`Owner`].
//! Positive amounts are income, negative amounts are expenses; the `kind`
//! column is kept alongside the sign for display and grouping.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Owner};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::InvalidKind(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-assigned. Ignored on insert.
    pub id: i64,
    pub owner: Owner,
    pub kind: TransactionKind,
    /// Signed amount in base currency units. The store does not enforce that
    /// the sign agrees with `kind`; callers must keep both consistent.
    pub amount: f64,
    pub note: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    /// Creation time, milliseconds since epoch.
    pub timestamp: i64,
}

impl TransactionRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: Owner,
        kind: TransactionKind,
        amount: f64,
        note: Option<String>,
        category: Option<String>,
        title: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: 0,
            owner,
            kind,
            amount,
            note,
            category,
            title,
            timestamp,
        }
    }
}

/// One aggregate row of a category breakdown. Derived, never stored; rows
/// with a NULL category form their own group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Option<String>,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_id: String,
    pub kind: String,
    pub amount: f64,
    pub note: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub timestamp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TransactionRecord> for ActiveModel {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: ActiveValue::NotSet,
            owner_id: ActiveValue::Set(record.owner.storage_id().to_string()),
            kind: ActiveValue::Set(record.kind.as_str().to_string()),
            amount: ActiveValue::Set(record.amount),
            note: ActiveValue::Set(record.note.clone()),
            category: ActiveValue::Set(record.category.clone()),
            title: ActiveValue::Set(record.title.clone()),
            timestamp: ActiveValue::Set(record.timestamp),
        }
    }
}

impl TryFrom<Model> for TransactionRecord {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner: Owner::from_storage(&model.owner_id),
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: model.amount,
            note: model.note,
            category: model.category,
            title: model.title,
            timestamp: model.timestamp,
        })
    }
}
