use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::category::CategoryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Expense,
    Income,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
            TransactionType::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expense" => Some(TransactionType::Expense),
            "income" => Some(TransactionType::Income),
            "transfer" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

/// Ledger row as written by the transaction module. Only used for seeding here.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub category_id: Option<i64>,
    pub date: String,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub is_paid: bool,
    #[serde(default)]
    pub description: String,
}

/// Paid totals of one category split by transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RealizedTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

impl RealizedTotals {
    /// The bucket that counts towards a category of the given type.
    pub fn for_type(&self, category_type: CategoryType) -> Decimal {
        match category_type {
            CategoryType::Income => self.income,
            CategoryType::Expense => self.expense,
        }
    }
}
