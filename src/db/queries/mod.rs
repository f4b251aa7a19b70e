pub mod audit;
pub mod categories;
pub mod provisions;
pub mod templates;
pub mod transactions;

/// `?,?,?` for an `IN (...)` clause with `count` parameters.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
