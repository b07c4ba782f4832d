mod common;

use anyhow::Result;
use common::{StandardCustomers, db_path, form, test_service};
use ryugaku::application::{AppError, CustomerService, DashboardReport};
use ryugaku::domain::{AmountProblem, PaymentStatus, aggregate, parse_customers_json};
use sqlx::SqlitePool;

#[tokio::test]
async fn test_dashboard_totals_and_counselors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCustomers::create(&service).await?;

    let dashboard = service.dashboard().await?;
    let report = &dashboard.report;

    assert_eq!(dashboard.customer_count, 4);
    assert_eq!(report.total_revenue, 1_150_000);
    assert_eq!(report.total_profit, 205_000);

    let counselors: Vec<(&str, i128)> = report
        .profit_by_counselor
        .iter()
        .map(|e| (e.counselor.as_str(), e.profit))
        .collect();
    assert_eq!(
        counselors,
        vec![("Sato", 125_000), ("Tanaka", 50_000), ("", 30_000)]
    );

    // Every fixture leaves amount_paid_to_school empty
    assert_eq!(dashboard.issues.len(), 4);
    assert!(
        dashboard
            .issues
            .iter()
            .all(|i| i.field == "amount_paid_to_school" && i.problem == AmountProblem::Missing)
    );

    Ok(())
}

#[tokio::test]
async fn test_dashboard_on_empty_database() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let dashboard = service.dashboard().await?;
    assert_eq!(dashboard.customer_count, 0);
    assert_eq!(dashboard.report.total_revenue, 0);
    assert_eq!(dashboard.report.total_profit, 0);
    assert!(dashboard.report.profit_by_counselor.is_empty());
    assert!(!dashboard.has_issues());

    Ok(())
}

#[tokio::test]
async fn test_dashboard_is_recomputed_after_create() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCustomers::create(&service).await?;
    let before = service.dashboard().await?;

    service
        .create_customer(form("Eve", "Kato", "80000", "8000", PaymentStatus::UNPAID))
        .await?;
    let after = service.dashboard().await?;

    assert_eq!(after.customer_count, before.customer_count + 1);
    assert_eq!(after.report.total_revenue, before.report.total_revenue + 80_000);
    assert_eq!(after.report.profit_by_counselor.get("Kato"), Some(8_000));
    assert_eq!(
        after.report.profit_by_counselor.counselors().last(),
        Some("Kato")
    );

    Ok(())
}

#[tokio::test]
async fn test_dashboard_is_deterministic() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCustomers::create(&service).await?;

    let first = service.dashboard().await?;
    let second = service.dashboard().await?;
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);

    Ok(())
}

#[tokio::test]
async fn test_corrupted_amounts_do_not_abort_report() -> Result<()> {
    let (service, temp) = test_service().await?;
    let created = StandardCustomers::create(&service).await?;

    // Write values the application itself would never store
    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path(&temp))).await?;
    sqlx::query("UPDATE customers SET agency_profit = 'NaN' WHERE id = ?")
        .bind(created[0].id)
        .execute(&pool)
        .await?;
    sqlx::query("UPDATE customers SET total_amount_received = NULL WHERE id = ?")
        .bind(created[1].id)
        .execute(&pool)
        .await?;
    sqlx::query("UPDATE customers SET agency_profit = 12.5 WHERE id = ?")
        .bind(created[2].id)
        .execute(&pool)
        .await?;
    pool.close().await;

    let dashboard = service.dashboard().await?;
    let report = &dashboard.report;

    // Alice's profit, Bob's revenue and Alan's profit now count as zero
    assert_eq!(report.total_revenue, 500_000 + 200_000 + 150_000);
    assert_eq!(report.total_profit, 50_000 + 30_000);
    assert_eq!(report.profit_by_counselor.get("Sato"), Some(0));
    assert_eq!(report.profit_by_counselor.len(), 3);

    let flagged: Vec<(i64, &str)> = dashboard
        .issues
        .iter()
        .filter(|i| i.field != "amount_paid_to_school")
        .map(|i| (i.customer_id, i.field))
        .collect();
    assert_eq!(
        flagged,
        vec![
            (created[0].id, "agency_profit"),
            (created[1].id, "total_amount_received"),
            (created[2].id, "agency_profit"),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_text_amounts_in_store_are_parsed() -> Result<()> {
    let (service, temp) = test_service().await?;
    let created = service
        .create_customer(form("Fay", "Sato", "0", "0", ""))
        .await?;

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path(&temp))).await?;
    sqlx::query("UPDATE customers SET agency_profit = '12,000' WHERE id = ?")
        .bind(created.id)
        .execute(&pool)
        .await?;
    pool.close().await;

    let report = service.dashboard().await?.report;
    assert_eq!(report.total_profit, 12_000);

    Ok(())
}

#[tokio::test]
async fn test_out_of_range_stored_amount_is_an_error() -> Result<()> {
    let (service, temp) = test_service().await?;
    let created = StandardCustomers::create(&service).await?;

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path(&temp))).await?;
    sqlx::query("UPDATE customers SET agency_profit = '99999999999999999999' WHERE id = ?")
        .bind(created[1].id)
        .execute(&pool)
        .await?;
    pool.close().await;

    let result = service.dashboard().await;
    assert!(matches!(result, Err(AppError::Database(_))));
    assert!(matches!(
        service.get_customer(created[1].id).await,
        Err(AppError::Database(_))
    ));

    // Other records remain readable
    assert_eq!(service.get_customer(created[0].id).await?, created[0]);

    Ok(())
}

#[tokio::test]
async fn test_connect_reads_existing_database() -> Result<()> {
    let (service, temp) = test_service().await?;
    StandardCustomers::create(&service).await?;
    drop(service);

    let reopened = CustomerService::connect(&db_path(&temp)).await?;
    assert_eq!(reopened.dashboard().await?.report.total_profit, 205_000);

    Ok(())
}

#[test]
fn test_dashboard_from_json_snapshot() {
    let json = r#"[
        {"id": 1, "name": "A", "assigned_to": "A", "total_amount_received": 1000, "agency_profit": 100},
        {"id": 2, "name": "B", "assigned_to": "B", "total_amount_received": 500, "agency_profit": 50},
        {"id": 3, "name": "C", "assigned_to": "A", "total_amount_received": "250", "agency_profit": 25}
    ]"#;

    let customers = parse_customers_json(json).unwrap();
    let dashboard = DashboardReport::build(&customers);

    assert_eq!(dashboard.report, aggregate(&customers));
    assert_eq!(dashboard.report.total_revenue, 1750);
    assert_eq!(dashboard.report.profit_by_counselor.get("A"), Some(125));
    assert_eq!(dashboard.report.profit_by_counselor.get("B"), Some(50));
}
