use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateItem {
    pub category_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub planned_amount: Decimal,
}

/// Named planned amounts captured from a source period.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionTemplate {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub source_month: u32,
    pub source_year: i32,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<TemplateItem>,
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub source_month: u32,
    pub source_year: i32,
    pub created_by: i64,
    pub items: Vec<TemplateItem>,
}
