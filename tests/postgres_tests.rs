// PostgreSQL store tests
//
// These run against a disposable database and are ignored by default:
//   DATABASE_URL=postgres://localhost/vendor_match_test cargo test --test postgres_tests -- --ignored

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use vendor_match::core::Matcher;
use vendor_match::models::{CreateVendorRequest, ProjectStatus, ServiceType};
use vendor_match::services::{MatchStore, NewProject, PostgresClient, StoreError};

async fn connect() -> Option<(Arc<PostgresClient>, PgPool)> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };

    // Runs the embedded migrations
    let store = PostgresClient::new(&url, 16, 1, Duration::from_secs(10), Duration::from_secs(60))
        .await
        .expect("Failed to connect to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("Failed to open test pool");

    Some((Arc::new(store), pool))
}

/// One client, one project and three vendors, isolated by a unique country
struct Fixture {
    user_id: i64,
    project_id: i64,
    /// Offers both needed services
    strong_vendor: i64,
    /// Offers one needed service
    weak_vendor: i64,
    tag: String,
}

impl Fixture {
    async fn create(store: &PostgresClient, pool: &PgPool) -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let country = format!("Testland {}", tag);

        let user_id: i64 = sqlx::query(
            "INSERT INTO users (company_name, contact_email) VALUES ($1, $2) RETURNING id",
        )
        .bind(format!("Client {}", tag))
        .bind(format!("{}@example.test", tag))
        .fetch_one(pool)
        .await
        .unwrap()
        .get("id");

        let vendor = |name: &str, countries: Vec<String>, services: Vec<ServiceType>| CreateVendorRequest {
            name: format!("{} {}", name, tag),
            countries_supported: countries,
            services_offered: services,
            rating: Some(4.5),
            response_sla_hours: Some(12),
            sla_expires_at: None,
        };

        let strong = store
            .create_vendor(vendor(
                "Strong",
                vec![country.clone()],
                vec![ServiceType::AiMl, ServiceType::Consulting],
            ))
            .await
            .unwrap();
        let weak = store
            .create_vendor(vendor("Weak", vec![country.clone()], vec![ServiceType::AiMl]))
            .await
            .unwrap();
        store
            .create_vendor(vendor(
                "Elsewhere",
                vec![format!("Elsewhere {}", tag)],
                vec![ServiceType::AiMl],
            ))
            .await
            .unwrap();

        let project = store
            .create_project(NewProject {
                user_id,
                country,
                services_needed: vec![ServiceType::AiMl, ServiceType::Consulting],
                budget: 50_000.0,
                status: ProjectStatus::Active,
            })
            .await
            .unwrap();

        Self {
            user_id,
            project_id: project.id,
            strong_vendor: strong.id,
            weak_vendor: weak.id,
            tag,
        }
    }

    async fn cleanup(&self, pool: &PgPool) {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.user_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM vendors WHERE name LIKE $1")
            .bind(format!("% {}", self.tag))
            .execute(pool)
            .await
            .unwrap();
    }
}

/// (id, vendor_id, score) rows for a project, best first
async fn stored_matches(pool: &PgPool, project_id: i64) -> Vec<(i64, i64, f64)> {
    sqlx::query(
        "SELECT id, vendor_id, score FROM matches WHERE project_id = $1 ORDER BY score DESC, vendor_id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
    .unwrap()
    .iter()
    .map(|row| (row.get("id"), row.get("vendor_id"), row.get("score")))
    .collect()
}

#[tokio::test]
#[ignore]
async fn test_concurrent_rebuilds_keep_one_row_per_vendor() {
    let Some((store, pool)) = connect().await else { return };
    let fixture = Fixture::create(&store, &pool).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let project_id = fixture.project_id;
            tokio::spawn(async move {
                let matcher = Matcher::default();
                store.rebuild_matches(project_id, &matcher).await
            })
        })
        .collect();

    for handle in handles {
        let rebuilt = handle.await.unwrap().unwrap();
        assert_eq!(rebuilt.len(), 2);
    }

    let rows = sqlx::query(
        "SELECT vendor_id, COUNT(*) AS copies FROM matches WHERE project_id = $1 GROUP BY vendor_id",
    )
    .bind(fixture.project_id)
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.get::<i64, _>("copies") == 1));

    let stored = stored_matches(&pool, fixture.project_id).await;
    assert_eq!(stored[0].1, fixture.strong_vendor);
    assert_eq!(stored[1].1, fixture.weak_vendor);

    fixture.cleanup(&pool).await;
}

#[tokio::test]
#[ignore]
async fn test_failed_rebuild_rolls_back() {
    let Some((store, pool)) = connect().await else { return };
    let fixture = Fixture::create(&store, &pool).await;
    let matcher = Matcher::default();

    store.rebuild_matches(fixture.project_id, &matcher).await.unwrap();
    let before = stored_matches(&pool, fixture.project_id).await;
    assert_eq!(before.len(), 2);

    // Delete the weak vendor without committing. The cascade locks its match
    // row, so the rebuild reads the vendor, then blocks on its own DELETE.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("DELETE FROM vendors WHERE id = $1")
        .bind(fixture.weak_vendor)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let rebuild = {
        let store = store.clone();
        let project_id = fixture.project_id;
        tokio::spawn(async move {
            let matcher = Matcher::default();
            store.rebuild_matches(project_id, &matcher).await
        })
    };

    let mut waiting = false;
    for _ in 0..100 {
        let blocked: i64 = sqlx::query(
            "SELECT COUNT(*) AS blocked FROM pg_stat_activity \
             WHERE datname = current_database() AND wait_event_type = 'Lock' \
             AND query LIKE 'DELETE FROM matches%'",
        )
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("blocked");

        if blocked > 0 {
            waiting = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(waiting, "rebuild never blocked on the match rows");

    // The insert now references a vendor that no longer exists
    blocker.commit().await.unwrap();
    let result = rebuild.await.unwrap();
    assert!(matches!(result, Err(StoreError::SqlxError(_))));

    // Only the cascade from the vendor delete is visible; the rebuild left nothing behind
    let after = stored_matches(&pool, fixture.project_id).await;
    let expected: Vec<_> = before
        .into_iter()
        .filter(|(_, vendor_id, _)| *vendor_id != fixture.weak_vendor)
        .collect();
    assert_eq!(after, expected);

    fixture.cleanup(&pool).await;
}

#[tokio::test]
#[ignore]
async fn test_rebuild_missing_project_leaves_matches_alone() {
    let Some((store, pool)) = connect().await else { return };
    let fixture = Fixture::create(&store, &pool).await;
    let matcher = Matcher::default();

    store.rebuild_matches(fixture.project_id, &matcher).await.unwrap();
    let before = stored_matches(&pool, fixture.project_id).await;

    let missing = i64::MAX;
    let result = store.rebuild_matches(missing, &matcher).await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert!(stored_matches(&pool, missing).await.is_empty());
    assert_eq!(stored_matches(&pool, fixture.project_id).await, before);

    fixture.cleanup(&pool).await;
}

#[tokio::test]
#[ignore]
async fn test_project_for_unknown_owner_is_not_found() {
    let Some((store, _pool)) = connect().await else { return };

    let result = store
        .create_project(NewProject {
            user_id: i64::MAX,
            country: "Germany".to_string(),
            services_needed: vec![ServiceType::AiMl],
            budget: 1_000.0,
            status: ProjectStatus::Draft,
        })
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
}
