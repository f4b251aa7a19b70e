mod common;

use axum::http::StatusCode;
use common::{number, rows_by_category, TestClient};
use provisions::period::Period;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn test_save_and_apply_template() {
    let client = TestClient::new();
    let rent = client.expense_category("Rent", None);
    let food = client.expense_category("Food", None);
    let fun = client.expense_category("Fun", None);
    let source = Period::new(0, 2024);
    client.raw_provision(rent, source, dec!(1000));
    client.raw_provision(food, source, dec!(300));

    let (status, template) = client
        .post_json(
            "/api/provisions/templates",
            &json!({
                "name": "  Baseline  ",
                "description": "January plan",
                "period": { "month": 0, "year": 2024 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(template["name"], "Baseline");
    assert_eq!(template["source_month"], 0);
    assert_eq!(template["created_by"], common::USER_ID);
    // Fun has nothing planned and is not captured.
    let items = template["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i["category_id"] != fun));

    client.raw_provision(rent, Period::new(5, 2024), dec!(1));
    let template_id = template["id"].as_i64().unwrap();
    let (status, outcome) = client
        .post_json(
            &format!("/api/provisions/templates/{}/apply", template_id),
            &json!({ "target": { "month": 5, "year": 2024 } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "inserted": 1, "updated": 0 }));

    let (_, grid) = client
        .get_json("/api/provisions/grid?month=5&year=2024")
        .await;
    let rows = rows_by_category(&grid);
    assert_eq!(number(&rows[&rent]["planned"]), 1.0);
    assert_eq!(number(&rows[&food]["planned"]), 300.0);

    let (_, outcome) = client
        .post_json(
            &format!("/api/provisions/templates/{}/apply", template_id),
            &json!({ "target": { "month": 5, "year": 2024 }, "overwrite": true }),
        )
        .await;
    assert_eq!(outcome, json!({ "inserted": 0, "updated": 2 }));

    let (_, history) = client
        .get_json("/api/provisions/history?month=5&year=2024")
        .await;
    assert_eq!(history[0]["context"]["source"], "template");
    assert_eq!(history[0]["context"]["template_id"], template_id);
}

#[tokio::test]
async fn test_save_with_selection_and_replace_by_name() {
    let client = TestClient::new();
    let rent = client.expense_category("Rent", None);
    let food = client.expense_category("Food", None);
    let period = Period::new(3, 2024);
    client.raw_provision(rent, period, dec!(800));
    client.raw_provision(food, period, dec!(150));

    let payload = json!({
        "name": "Fixed costs",
        "period": { "month": 3, "year": 2024 },
        "category_ids": [rent]
    });
    let (_, first) = client.post_json("/api/provisions/templates", &payload).await;
    assert_eq!(first["items"].as_array().unwrap().len(), 1);

    let (_, second) = client
        .post_json(
            "/api/provisions/templates",
            &json!({ "name": "Fixed costs", "period": { "month": 3, "year": 2024 } }),
        )
        .await;
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["items"].as_array().unwrap().len(), 2);

    let (_, list) = client.get_json("/api/provisions/templates").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_template_name_is_rejected() {
    let client = TestClient::new();
    let (status, _) = client
        .post_json("/api/provisions/templates", &json!({ "name": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_apply_and_delete_unknown_template() {
    let client = TestClient::new();
    let (status, _) = client
        .post_json(
            "/api/provisions/templates/77/apply",
            &json!({ "target": { "month": 0, "year": 2024 } }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        client.delete("/api/provisions/templates/77").await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_templates_are_scoped_to_group() {
    let client = TestClient::new();
    let rent = client.expense_category("Rent", None);
    client.raw_provision(rent, Period::new(0, 2024), dec!(10));
    let (_, template) = client
        .post_json(
            "/api/provisions/templates",
            &json!({ "name": "Mine", "period": { "month": 0, "year": 2024 } }),
        )
        .await;
    let id = template["id"].as_i64().unwrap();

    let other = client.as_group(2);
    let (_, list) = other.get_json("/api/provisions/templates").await;
    assert!(list.as_array().unwrap().is_empty());
    assert_eq!(
        other.delete(&format!("/api/provisions/templates/{}", id)).await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.delete(&format!("/api/provisions/templates/{}", id)).await,
        StatusCode::NO_CONTENT
    );
}
