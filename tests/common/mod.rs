//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the router against a fresh in-memory database. Seed
//! helpers write straight through the query layer and release their pooled
//! connection before returning, since the in-memory pool holds a single one.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use provisions::config::Config;
use provisions::context::{GROUP_HEADER, USER_HEADER};
use provisions::db::queries::{categories, provisions as provision_queries, transactions};
use provisions::db::{create_in_memory_pool, migrations};
use provisions::models::{AuditAction, NewAuditLog, NewCategory, NewTransaction, TransactionType};
use provisions::period::Period;
use provisions::server;
use provisions::services::audit::record_provision_audit_log;
use provisions::state::AppState;
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::Path;
use tower::ServiceExt;

pub const GROUP_ID: i64 = 1;
pub const USER_ID: i64 = 10;

pub struct TestClient {
    state: AppState,
    group_id: i64,
    user_id: i64,
}

impl TestClient {
    /// A client for group 1 with a fresh in-memory database.
    pub fn new() -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        {
            let conn = pool.get().expect("Failed to get connection");
            migrations::run_migrations(&conn, Path::new("migrations"))
                .expect("Failed to run migrations");
        }

        Self {
            state: AppState::new(pool, Config::in_memory()),
            group_id: GROUP_ID,
            user_id: USER_ID,
        }
    }

    /// Same database, acting as another group.
    pub fn as_group(&self, group_id: i64) -> Self {
        Self {
            state: self.state.clone(),
            group_id,
            user_id: self.user_id,
        }
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(GROUP_HEADER, self.group_id.to_string())
            .header(USER_HEADER, self.user_id.to_string())
    }

    /// GET with the group headers set.
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(self.request("GET", uri).body(Body::empty()).unwrap())
            .await
    }

    /// GET without any group headers.
    pub async fn get_anonymous(&self, uri: &str) -> (StatusCode, String) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    pub async fn post_json(&self, uri: &str, payload: &Value) -> (StatusCode, Value) {
        let (status, body) = self
            .send(
                self.request("POST", uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        self.send(self.request("DELETE", uri).body(Body::empty()).unwrap())
            .await
            .0
    }

    // =========================================================================
    // Seed helpers writing through the query layer
    // =========================================================================

    pub fn create_category(&self, category: NewCategory) -> i64 {
        let conn = self.state.db.get().expect("Failed to get connection");
        categories::create_category(&conn, self.group_id, &category).unwrap()
    }

    pub fn expense_category(&self, name: &str, parent_id: Option<i64>) -> i64 {
        self.create_category(NewCategory::expense(name, parent_id))
    }

    pub fn income_category(&self, name: &str, parent_id: Option<i64>) -> i64 {
        self.create_category(NewCategory::income(name, parent_id))
    }

    pub fn deactivate_category(&self, id: i64) {
        let conn = self.state.db.get().expect("Failed to get connection");
        categories::set_category_active(&conn, self.group_id, id, false).unwrap();
    }

    /// A paid ledger entry on `date` (YYYY-MM-DD).
    pub fn paid_transaction(
        &self,
        category_id: i64,
        date: &str,
        amount_cents: i64,
        transaction_type: TransactionType,
    ) -> i64 {
        self.transaction(category_id, date, amount_cents, transaction_type, true)
    }

    pub fn transaction(
        &self,
        category_id: i64,
        date: &str,
        amount_cents: i64,
        transaction_type: TransactionType,
        is_paid: bool,
    ) -> i64 {
        let conn = self.state.db.get().expect("Failed to get connection");
        transactions::create_transaction(
            &conn,
            self.group_id,
            &NewTransaction {
                category_id: Some(category_id),
                date: date.to_string(),
                amount_cents,
                transaction_type,
                is_paid,
                description: String::new(),
            },
        )
        .unwrap()
    }

    /// Insert a provision without going through the audited write path.
    pub fn raw_provision(&self, category_id: i64, period: Period, amount: Decimal) -> i64 {
        let conn = self.state.db.get().expect("Failed to get connection");
        provision_queries::insert_provision(&conn, self.group_id, category_id, period, amount, None)
            .unwrap()
    }

    pub fn provision_count(&self) -> i64 {
        let conn = self.state.db.get().expect("Failed to get connection");
        provision_queries::count_provisions(&conn, self.group_id).unwrap()
    }

    /// Record a `create` history entry for `category_id` directly.
    pub fn audit_entry(
        &self,
        category_id: i64,
        period: Period,
        new_amount: Decimal,
        context: Option<Value>,
    ) -> i64 {
        let conn = self.state.db.get().expect("Failed to get connection");
        record_provision_audit_log(
            &conn,
            &NewAuditLog {
                group_id: self.group_id,
                user_id: self.user_id,
                category_id,
                period,
                action: AuditAction::Create,
                previous_amount: None,
                new_amount: Some(new_amount),
                context,
            },
        )
        .unwrap()
    }

    pub fn audit_count(&self) -> i64 {
        let conn = self.state.db.get().expect("Failed to get connection");
        provisions::db::queries::audit::count_audit_logs(&conn, self.group_id).unwrap()
    }
}

/// Grid rows keyed by category id.
pub fn rows_by_category(grid: &Value) -> std::collections::HashMap<i64, Value> {
    grid["rows"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|r| (r["category_id"].as_i64().unwrap(), r.clone()))
                .collect()
        })
        .unwrap_or_default()
}

pub fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value))
}
