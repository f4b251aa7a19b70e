use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::category::CategoryType;
use crate::period::Period;

/// Planned amount for one category in one month.
#[derive(Debug, Clone, Serialize)]
pub struct Provision {
    pub id: i64,
    pub group_id: i64,
    pub category_id: i64,
    pub month: u32,
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub planned_amount: Decimal,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Provision {
    pub fn period(&self) -> Period {
        Period::new(self.month, self.year)
    }
}

/// One planned amount to write for a category.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionEntry {
    pub category_id: i64,
    pub planned_amount: Decimal,
    pub note: NoteUpdate,
}

/// What to do with the stored note when a planned amount is written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NoteUpdate {
    #[default]
    Keep,
    Replace(Option<String>),
}

impl NoteUpdate {
    /// The note to persist given the one currently stored.
    pub fn resolve(&self, current: Option<&str>) -> Option<String> {
        match self {
            NoteUpdate::Keep => current.map(ToString::to_string),
            NoteUpdate::Replace(note) => note.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridTypeFilter {
    #[default]
    All,
    Expense,
    Income,
}

impl GridTypeFilter {
    pub fn matches(&self, category_type: CategoryType) -> bool {
        match self {
            GridTypeFilter::All => true,
            GridTypeFilter::Expense => category_type == CategoryType::Expense,
            GridTypeFilter::Income => category_type == CategoryType::Income,
        }
    }
}

impl From<CategoryType> for GridTypeFilter {
    fn from(value: CategoryType) -> Self {
        match value {
            CategoryType::Expense => GridTypeFilter::Expense,
            CategoryType::Income => GridTypeFilter::Income,
        }
    }
}

/// Planned vs realized for one category in the requested period.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionsGridRow {
    pub id: i64,
    pub category_id: i64,
    pub provision_id: Option<i64>,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub parent_id: Option<i64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub planned: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub realized: Decimal,
    pub note: Option<String>,
}

/// Headline numbers for a period.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionMetrics {
    pub month: u32,
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub planned_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub realized_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub coverage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub over_budget_total: Decimal,
}

/// Rows written by an upsert-style batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertOutcome {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}
