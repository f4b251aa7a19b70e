use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    CopyCreate,
    CopyUpdate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::CopyCreate => "copy_create",
            AuditAction::CopyUpdate => "copy_update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "delete" => Some(AuditAction::Delete),
            "copy_create" => Some(AuditAction::CopyCreate),
            "copy_update" => Some(AuditAction::CopyUpdate),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored history entry. Never updated or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionAuditLog {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub month: u32,
    pub year: i32,
    pub action: AuditAction,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub previous_amount: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub new_amount: Option<Decimal>,
    pub context: Value,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub group_id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub period: Period,
    pub action: AuditAction,
    pub previous_amount: Option<Decimal>,
    pub new_amount: Option<Decimal>,
    pub context: Option<Value>,
}
