use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use crate::core::Matcher;
use crate::models::{
    CreateVendorRequest, Match, Project, ProjectStatus, ServiceType, UpdateProjectRequest,
    UpdateVendorRequest, User, Vendor,
};
use crate::services::store::{
    client_not_found, match_not_found, project_not_found, vendor_name_taken, vendor_not_found,
    MatchFilter, MatchStore, NewProject, StoreError,
};

const USER_COLUMNS: &str = "id, company_name, contact_email, is_admin";

const PROJECT_COLUMNS: &str =
    "id, user_id, country, services_needed, budget, status, created_at, updated_at";

const VENDOR_COLUMNS: &str = "id, name, countries_supported, services_offered, rating, \
     response_sla_hours, sla_expires_at, sla_expired, created_at, updated_at";

const MATCH_COLUMNS: &str = "id, project_id, vendor_id, score, created_at";

/// PostgreSQL-backed store
///
/// Rebuilds run in one transaction that locks the project row first, so two
/// rebuilds of the same project are serialized while different projects
/// proceed in parallel.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn parse_services(raw: Vec<String>) -> Result<Vec<ServiceType>, StoreError> {
    raw.iter()
        .map(|s| s.parse::<ServiceType>().map_err(StoreError::InvalidData))
        .collect()
}

fn service_names(services: &[ServiceType]) -> Vec<String> {
    services.iter().map(|s| s.as_str().to_string()).collect()
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        company_name: row.try_get("company_name")?,
        contact_email: row.try_get("contact_email")?,
        is_admin: row.try_get("is_admin")?,
    })
}

fn project_from_row(row: &PgRow) -> Result<Project, StoreError> {
    let status: String = row.try_get("status")?;

    Ok(Project {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        country: row.try_get("country")?,
        services_needed: parse_services(row.try_get("services_needed")?)?,
        budget: row.try_get("budget")?,
        status: status.parse().map_err(StoreError::InvalidData)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn vendor_from_row(row: &PgRow) -> Result<Vendor, StoreError> {
    Ok(Vendor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        countries_supported: row.try_get("countries_supported")?,
        services_offered: parse_services(row.try_get("services_offered")?)?,
        rating: row.try_get("rating")?,
        response_sla_hours: row.try_get("response_sla_hours")?,
        sla_expires_at: row.try_get("sla_expires_at")?,
        sla_expired: row.try_get("sla_expired")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    Ok(Match {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        vendor_id: row.try_get("vendor_id")?,
        score: row.try_get("score")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Map a unique-name violation to `Conflict`
fn vendor_write_error(err: sqlx::Error, name: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return vendor_name_taken(name);
        }
    }
    err.into()
}

fn project_write_error(err: sqlx::Error, user_id: i64) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return client_not_found(user_id);
        }
    }
    err.into()
}

#[async_trait]
impl MatchStore for PostgresClient {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>, StoreError> {
        let query = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);

        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(project_from_row)
            .transpose()
    }

    async fn list_projects(&self, user_id: Option<i64>) -> Result<Vec<Project>, StoreError> {
        let query = format!(
            "SELECT {} FROM projects WHERE ($1::BIGINT IS NULL OR user_id = $1) ORDER BY id",
            PROJECT_COLUMNS
        );

        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(project_from_row).collect()
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let query = format!(
            r#"
            INSERT INTO projects (user_id, country, services_needed, budget, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(project.user_id)
            .bind(&project.country)
            .bind(service_names(&project.services_needed))
            .bind(project.budget)
            .bind(project.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| project_write_error(e, project.user_id))?;

        project_from_row(&row)
    }

    async fn update_project(&self, id: i64, changes: UpdateProjectRequest) -> Result<Project, StoreError> {
        let query = format!(
            r#"
            UPDATE projects SET
                country = COALESCE($2, country),
                services_needed = COALESCE($3, services_needed),
                budget = COALESCE($4, budget),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(changes.country)
            .bind(changes.services_needed.as_deref().map(service_names))
            .bind(changes.budget)
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| project_not_found(id))?;

        project_from_row(&row)
    }

    async fn delete_project(&self, id: i64) -> Result<Project, StoreError> {
        let query = format!("DELETE FROM projects WHERE id = $1 RETURNING {}", PROJECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| project_not_found(id))?;

        project_from_row(&row)
    }

    async fn active_project_ids(&self) -> Result<Vec<i64>, StoreError> {
        let rows = sqlx::query("SELECT id FROM projects WHERE status = $1 ORDER BY id")
            .bind(ProjectStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get("id").map_err(StoreError::from))
            .collect()
    }

    async fn get_vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError> {
        let query = format!("SELECT {} FROM vendors WHERE id = $1", VENDOR_COLUMNS);

        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(vendor_from_row)
            .transpose()
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>, StoreError> {
        let query = format!("SELECT {} FROM vendors ORDER BY id", VENDOR_COLUMNS);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(vendor_from_row).collect()
    }

    async fn create_vendor(&self, vendor: CreateVendorRequest) -> Result<Vendor, StoreError> {
        let query = format!(
            r#"
            INSERT INTO vendors (
                name, countries_supported, services_offered, rating,
                response_sla_hours, sla_expires_at, sla_expired
            )
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($6 < NOW(), FALSE))
            RETURNING {}
            "#,
            VENDOR_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&vendor.name)
            .bind(&vendor.countries_supported)
            .bind(service_names(&vendor.services_offered))
            .bind(vendor.rating.unwrap_or(0.0))
            .bind(vendor.response_sla_hours.unwrap_or_else(crate::models::domain::default_sla_hours))
            .bind(vendor.sla_expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| vendor_write_error(e, &vendor.name))?;

        vendor_from_row(&row)
    }

    async fn update_vendor(&self, id: i64, changes: UpdateVendorRequest) -> Result<Vendor, StoreError> {
        let query = format!(
            r#"
            UPDATE vendors SET
                name = COALESCE($2, name),
                countries_supported = COALESCE($3, countries_supported),
                services_offered = COALESCE($4, services_offered),
                rating = COALESCE($5, rating),
                response_sla_hours = COALESCE($6, response_sla_hours),
                sla_expires_at = COALESCE($7, sla_expires_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            VENDOR_COLUMNS
        );

        let name = changes.name.clone().unwrap_or_default();
        let row = sqlx::query(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.countries_supported)
            .bind(changes.services_offered.as_deref().map(service_names))
            .bind(changes.rating)
            .bind(changes.response_sla_hours)
            .bind(changes.sla_expires_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| vendor_write_error(e, &name))?
            .ok_or_else(|| vendor_not_found(id))?;

        vendor_from_row(&row)
    }

    async fn delete_vendor(&self, id: i64) -> Result<Vendor, StoreError> {
        let query = format!("DELETE FROM vendors WHERE id = $1 RETURNING {}", VENDOR_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| vendor_not_found(id))?;

        vendor_from_row(&row)
    }

    async fn flag_expired_slas(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError> {
        let query = r#"
            UPDATE vendors SET
                sla_expired = (sla_expires_at IS NOT NULL AND sla_expires_at < $1),
                updated_at = $1
            WHERE sla_expired IS DISTINCT FROM (sla_expires_at IS NOT NULL AND sla_expires_at < $1)
        "#;

        let result = sqlx::query(query).bind(now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn get_match(&self, id: i64) -> Result<Option<Match>, StoreError> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);

        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(match_from_row)
            .transpose()
    }

    async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<Match>, StoreError> {
        let order = "ORDER BY score DESC, vendor_id ASC";

        let rows = match filter {
            MatchFilter::All => {
                let query = format!("SELECT {} FROM matches {}", MATCH_COLUMNS, order);
                sqlx::query(&query).fetch_all(&self.pool).await?
            }
            MatchFilter::Project(project_id) => {
                let query = format!("SELECT {} FROM matches WHERE project_id = $1 {}", MATCH_COLUMNS, order);
                sqlx::query(&query).bind(project_id).fetch_all(&self.pool).await?
            }
            MatchFilter::Vendor(vendor_id) => {
                let query = format!("SELECT {} FROM matches WHERE vendor_id = $1 {}", MATCH_COLUMNS, order);
                sqlx::query(&query).bind(vendor_id).fetch_all(&self.pool).await?
            }
            MatchFilter::Top(limit) => {
                let query = format!("SELECT {} FROM matches {} LIMIT $1", MATCH_COLUMNS, order);
                sqlx::query(&query).bind(limit as i64).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(match_from_row).collect()
    }

    async fn delete_match(&self, id: i64) -> Result<Match, StoreError> {
        let query = format!("DELETE FROM matches WHERE id = $1 RETURNING {}", MATCH_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| match_not_found(id))?;

        match_from_row(&row)
    }

    async fn rebuild_matches(&self, project_id: i64, matcher: &Matcher) -> Result<Vec<Match>, StoreError> {
        // Dropping the transaction on any early return rolls it back
        let mut tx = self.pool.begin().await?;

        let lock_query = format!("SELECT {} FROM projects WHERE id = $1 FOR UPDATE", PROJECT_COLUMNS);
        let project = match sqlx::query(&lock_query)
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(row) => project_from_row(&row)?,
            None => return Err(project_not_found(project_id)),
        };

        let vendor_query = format!(
            "SELECT {} FROM vendors WHERE countries_supported @> ARRAY[$1]::TEXT[] ORDER BY id",
            VENDOR_COLUMNS
        );
        let vendors = sqlx::query(&vendor_query)
            .bind(&project.country)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(vendor_from_row)
            .collect::<Result<Vec<Vendor>, StoreError>>()?;

        let scored = matcher.score_candidates(&project, &vendors);

        let deleted = sqlx::query("DELETE FROM matches WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if !scored.is_empty() {
            let vendor_ids: Vec<i64> = scored.iter().map(|s| s.vendor_id).collect();
            let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();

            sqlx::query(
                r#"
                INSERT INTO matches (project_id, vendor_id, score)
                SELECT $1, t.vendor_id, t.score
                FROM UNNEST($2::BIGINT[], $3::DOUBLE PRECISION[]) AS t(vendor_id, score)
                "#,
            )
            .bind(project_id)
            .bind(&vendor_ids)
            .bind(&scores)
            .execute(&mut *tx)
            .await?;
        }

        let read_back = format!(
            "SELECT {} FROM matches WHERE project_id = $1 ORDER BY score DESC, vendor_id ASC",
            MATCH_COLUMNS
        );
        let matches = sqlx::query(&read_back)
            .bind(project_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(match_from_row)
            .collect::<Result<Vec<Match>, StoreError>>()?;

        tx.commit().await?;

        tracing::debug!(
            "Rebuilt matches for project {}: {} removed, {} inserted",
            project_id,
            deleted,
            matches.len()
        );

        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
