pub mod audit;
pub mod category;
pub mod provision;
pub mod template;
pub mod transaction;

pub use audit::{AuditAction, NewAuditLog, ProvisionAuditLog};
pub use category::{Category, CategoryDictionaryEntry, CategoryType, NewCategory};
pub use provision::{
    GridTypeFilter, NoteUpdate, Provision, ProvisionEntry, ProvisionMetrics, ProvisionsGridRow,
    UpsertOutcome,
};
pub use template::{NewTemplate, ProvisionTemplate, TemplateItem};
pub use transaction::{NewTransaction, RealizedTotals, TransactionType};
