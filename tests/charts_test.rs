mod common;

use axum::http::StatusCode;
use common::{number, TestClient};
use provisions::models::TransactionType;
use provisions::period::Period;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_planned_vs_actual_rolls_up_children() {
    let client = TestClient::new();
    let housing = client.expense_category("Housing", None);
    let rent = client.expense_category("Rent", Some(housing));
    let power = client.expense_category("Power", Some(housing));
    let food = client.expense_category("Food", None);
    let period = Period::new(4, 2024);

    client.raw_provision(housing, period, dec!(9999));
    client.raw_provision(rent, period, dec!(1000));
    client.raw_provision(power, period, dec!(120.25));
    client.raw_provision(food, period, dec!(400));
    client.paid_transaction(rent, "2024-05-01", 100_000, TransactionType::Expense);
    client.paid_transaction(power, "2024-05-20", 9_875, TransactionType::Expense);

    let (status, chart) = client
        .get_json("/api/provisions/charts/planned-vs-actual?month=4&year=2024")
        .await;
    assert_eq!(status, StatusCode::OK);

    let entries = chart.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["category_id"], housing);
    assert_eq!(number(&entries[0]["planned"]), 1120.25);
    assert_eq!(number(&entries[0]["realized"]), 1098.75);
    assert_eq!(entries[1]["category_id"], food);
}

#[tokio::test]
async fn test_planned_vs_actual_limit_and_type() {
    let client = TestClient::new();
    let period = Period::new(0, 2024);
    for (i, amount) in [dec!(10), dec!(30), dec!(20)].into_iter().enumerate() {
        let id = client.expense_category(&format!("E{}", i), None);
        client.raw_provision(id, period, amount);
    }
    let salary = client.income_category("Salary", None);
    client.raw_provision(salary, period, dec!(5000));

    let (_, chart) = client
        .get_json("/api/provisions/charts/planned-vs-actual?month=0&year=2024&limit=2")
        .await;
    let planned: Vec<f64> = chart
        .as_array()
        .unwrap()
        .iter()
        .map(|e| number(&e["planned"]))
        .collect();
    assert_eq!(planned, vec![30.0, 20.0]);

    let (_, chart) = client
        .get_json("/api/provisions/charts/planned-vs-actual?month=0&year=2024&type=income")
        .await;
    assert_eq!(chart.as_array().unwrap().len(), 1);
    assert_eq!(chart[0]["category_id"], salary);
}

#[tokio::test]
async fn test_expense_distribution_percentages() {
    let client = TestClient::new();
    let rent = client.expense_category("Rent", None);
    let food = client.expense_category("Food", None);
    let idle = client.expense_category("Idle", None);
    let salary = client.income_category("Salary", None);

    client.paid_transaction(rent, "2024-07-03", 75_000, TransactionType::Expense);
    client.paid_transaction(food, "2024-07-04", 25_000, TransactionType::Expense);
    client.paid_transaction(salary, "2024-07-01", 500_000, TransactionType::Income);

    let (status, chart) = client
        .get_json("/api/provisions/charts/expense-distribution?month=6&year=2024")
        .await;
    assert_eq!(status, StatusCode::OK);

    let entries = chart.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["category_id"], rent);
    assert_eq!(number(&entries[0]["percentage"]), 75.0);
    assert_eq!(number(&entries[1]["percentage"]), 25.0);
    assert!(entries.iter().all(|e| e["category_id"] != idle));
}

#[tokio::test]
async fn test_expense_distribution_empty_month() {
    let client = TestClient::new();
    client.expense_category("Rent", None);

    let (status, chart) = client
        .get_json("/api/provisions/charts/expense-distribution?month=6&year=2024")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(chart.as_array().unwrap().is_empty());
}
