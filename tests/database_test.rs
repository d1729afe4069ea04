//! Postgres warehouse tests. Run with a database available:
//! `DATABASE_URL=postgresql://... cargo test --test database_test -- --ignored`

use airbnb_insights::database::run_migrations;
use airbnb_insights::models::ViewName;
use airbnb_insights::repositories::{DimensionRepository, FactRepository};
use airbnb_insights::services::DashboardService;
use airbnb_insights::warehouse::{FactFilter, PgWarehouse, Warehouse, WarehouseError};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::sync::Arc;

async fn seed(pool: &PgPool) {
    sqlx::query(
        r#"
        INSERT INTO dim_location (id, neighbourhood_group, neighbourhood, latitude, longitude) VALUES
            ('loc-x', 'Manhattan', 'Harlem', 40.81155000, -73.94650000),
            ('loc-y', 'Brooklyn', 'Bushwick', 40.69440000, -73.92190000)
        "#,
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO dim_host (id, host_name) VALUES ('h1', 'Sonder'), ('h2', 'Maria')")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO dim_room_type (id, room_type) VALUES ('rt1', 'Entire home/apt'), ('rt2', 'Private room')",
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        INSERT INTO dim_date (id, date, day, month, year, day_of_week, is_weekend) VALUES
            ('d1', '2024-07-06', 6, 7, 2024, 'Saturday', TRUE),
            ('d2', '2024-08-05', 5, 8, 2024, 'Monday', FALSE)
        "#,
    )
    .execute(pool)
    .await
    .unwrap();

    for i in 0..6 {
        sqlx::query("INSERT INTO dim_listing (id, name, minimum_nights) VALUES ($1, $2, 2)")
            .bind(format!("l{}", i))
            .bind(format!("Harlem loft {}", i))
            .execute(pool)
            .await
            .unwrap();

        sqlx::query(
            r#"
            INSERT INTO fact_listing_daily
                (id, listing_id, host_id, location_id, room_type_id, date_id,
                 price, availability_365, number_of_reviews, reviews_per_month,
                 calculated_host_listings_count)
            VALUES ($1, $2, 'h1', 'loc-x', 'rt1', 'd1', $3, 180, $4, 1.25, 6)
            "#,
        )
        .bind(format!("f{}", i))
        .bind(format!("l{}", i))
        .bind(Decimal::new(15050, 2))
        .bind(8 + i)
        .execute(pool)
        .await
        .unwrap();
    }

    // one free listing-day and one orphan row with unresolved keys
    sqlx::query(
        r#"
        INSERT INTO fact_listing_daily
            (id, listing_id, host_id, location_id, room_type_id, date_id,
             price, availability_365, number_of_reviews)
        VALUES
            ('f6', 'l6', 'h2', 'loc-y', 'rt2', 'd2', 0, 10, NULL),
            ('f7', 'missing', 'nobody', 'nowhere', NULL, NULL, 75, 365, 3)
        "#,
    )
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_migrations_created_star_schema(pool: PgPool) {
    for table in [
        "dim_location",
        "dim_host",
        "dim_room_type",
        "dim_listing",
        "dim_date",
        "fact_listing_daily",
    ] {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        let exists: bool = row.get(0);
        assert!(exists, "Table {} should exist", table);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_schema_bootstrap_is_idempotent(pool: PgPool) {
    seed(&pool).await;
    run_migrations(&pool, None).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fact_listing_daily")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 8);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_fact_scan_pushes_filters_down(pool: PgPool) {
    seed(&pool).await;
    let repo = FactRepository::new(pool);

    assert_eq!(repo.count().await.unwrap(), 8);

    let all = repo.scan(&FactFilter::all()).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7"]);

    let priced = repo.scan(&FactFilter::all().positive_price()).await.unwrap();
    assert_eq!(priced.len(), 7);
    assert_eq!(priced[0].price, Some(Decimal::new(15050, 2)));

    let reviewed = repo.scan(&FactFilter::all().reviews_above(10)).await.unwrap();
    let ids: Vec<&str> = reviewed.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f3", "f4", "f5"]);

    let with_reviews = repo.scan(&FactFilter::all().with_reviews()).await.unwrap();
    assert_eq!(with_reviews.len(), 7);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_dimension_lookups_skip_unknown_keys(pool: PgPool) {
    seed(&pool).await;
    let repo = DimensionRepository::new(pool);

    let hosts = repo
        .find_hosts(&["h1".to_string(), "nobody".to_string()])
        .await
        .unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].host_name.as_deref(), Some("Sonder"));

    let dates = repo.find_dates(&["d1".to_string()]).await.unwrap();
    assert_eq!(dates[0].year_month().unwrap().to_string(), "Jul 2024");

    assert!(repo.find_locations(&[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_dashboard_over_postgres(pool: PgPool) {
    seed(&pool).await;
    let service = DashboardService::new(Arc::new(PgWarehouse::new(pool)));

    let prices = service.get_price_location_data().await.unwrap();
    assert!(!prices.is_degraded());
    let harlem = &prices.data.neighbourhood_prices[0];
    assert_eq!(harlem.neighbourhood, "Harlem");
    // 150.50 rounds half away from zero
    assert_eq!(harlem.avg_price, 151);
    assert_eq!(harlem.listings, 6);

    let stats = service.get_general_stats().await.data;
    assert_eq!(stats.total_listings, 7);
    assert!(!stats.fallback);

    for view in ViewName::ALL {
        assert!(service.view(view).await.is_ok(), "{}", view);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_closed_pool_is_unavailable(pool: PgPool) {
    let warehouse = PgWarehouse::new(pool.clone());
    pool.close().await;

    let err = warehouse.scan_facts(&FactFilter::all()).await.unwrap_err();
    assert!(matches!(err, WarehouseError::Unavailable(_)));
}
