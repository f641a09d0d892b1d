//! Postgres-backed table store.
//!
//! Rows are read back with `to_jsonb(t.*)` and written through
//! `jsonb_populate_record`, so the database performs all column typing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};

use super::{BackendError, Database, Query, Table};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/portfolio".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<Arc<PgPool>, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(Arc::new(pool))
}

/// Creates the content tables if they do not exist yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_categories (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            description TEXT,
            image_url TEXT,
            thumbnail_url TEXT,
            images TEXT[] NOT NULL DEFAULT '{}',
            demo_url TEXT,
            code_url TEXT,
            instagram_url TEXT,
            youtube_views BIGINT,
            brand_name TEXT,
            client_name TEXT,
            project_date DATE,
            social_date DATE,
            social_links JSONB,
            metadata JSONB,
            show_on_home BOOLEAN NOT NULL DEFAULT false,
            is_featured BOOLEAN NOT NULL DEFAULT false,
            category_id UUID NOT NULL REFERENCES project_categories(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Tables created before social_date existed
    sqlx::query(
        r#"
        ALTER TABLE projects ADD COLUMN IF NOT EXISTS social_date DATE;
        ALTER TABLE projects ALTER COLUMN youtube_views TYPE BIGINT
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_projects_category_id ON projects(category_id);
        CREATE INDEX IF NOT EXISTS idx_projects_created_at ON projects(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_projects_home ON projects(show_on_home, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            description TEXT,
            icon TEXT,
            is_featured BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            client_name TEXT NOT NULL,
            client_image TEXT,
            rating INTEGER CHECK (rating BETWEEN 1 AND 5),
            review_text TEXT NOT NULL,
            project_type TEXT,
            is_featured BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            email_confirmed BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES auth_users(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_profiles_user_id ON profiles(user_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

pub struct PgDatabase {
    pool: Arc<PgPool>,
}

impl PgDatabase {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Translates constraint violations into the platform's error kinds.
fn map_error(table: Table, err: sqlx::Error) -> BackendError {
    if let Some(db_err) = err.as_database_error() {
        let column = db_err
            .constraint()
            .and_then(|c| table.columns().iter().find(|col| c.contains(**col)).copied());
        match db_err.code().as_deref() {
            Some("23503") => {
                return BackendError::ForeignKey {
                    table: table.name(),
                    column: column.unwrap_or("id"),
                }
            }
            Some("23505") => {
                return BackendError::UniqueViolation {
                    table: table.name(),
                    column: column.unwrap_or("id"),
                }
            }
            Some("23502") => {
                return BackendError::NotNull {
                    table: table.name(),
                    column: column.unwrap_or("id"),
                }
            }
            _ => {}
        }
    }
    BackendError::Database(err)
}

fn quoted(column: &str) -> String {
    format!("\"{}\"", column)
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_object<'a>(qb: &mut QueryBuilder<'a, Postgres>, alias: &str, columns: &[&str]) {
    qb.push("jsonb_build_object(");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("'{}', {}.{}", column, alias, quoted(column)));
    }
    qb.push(")");
}

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: &Value) {
    let target = format!("t.{}", quoted(column));
    match value {
        Value::Null => {
            qb.push(format!("{} IS NULL", target));
        }
        Value::Bool(b) => {
            qb.push(format!("{} = ", target)).push_bind(*b);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                qb.push(format!("{} = ", target)).push_bind(i);
            }
            None => {
                qb.push(format!("{} = ", target))
                    .push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            qb.push(format!("{}::text = ", target)).push_bind(s.clone());
        }
        other => {
            qb.push(format!("to_jsonb({}) = ", target))
                .push_bind(Json(other.clone()));
        }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        query.validate()?;
        let table = query.table;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        match &query.columns {
            Some(columns) => push_object(&mut qb, "t", columns),
            None => {
                qb.push("to_jsonb(t.*)");
            }
        }

        if let Some(join) = &query.join {
            qb.push(format!(
                " || jsonb_build_object('{}', (SELECT ",
                join.relation.name()
            ));
            push_object(&mut qb, "r", join.columns);
            qb.push(format!(
                " FROM {} r WHERE r.\"id\" = t.{}))",
                join.relation.name(),
                quoted(join.foreign_key)
            ));
        }

        qb.push(format!(" AS row FROM {} t", table.name()));

        for (i, (column, value)) in query.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            push_filter(&mut qb, column, value);
        }

        if let Some(order) = &query.order {
            qb.push(format!(
                " ORDER BY t.{} {}",
                quoted(order.column),
                if order.ascending { "ASC" } else { "DESC" }
            ));
        }

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows: Vec<(Value,)> = qb
            .build_query_as()
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(|e| map_error(table, e))?;

        Ok(rows.into_iter().map(|(row,)| row).collect())
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_error(table, e))?;
        let mut stored = Vec::with_capacity(rows.len());

        for row in rows {
            // jsonb_populate_record keeps an explicit null as NULL
            let row = table.insertable_row(row)?;
            let columns: Vec<String> = row.keys().cloned().collect();

            let sql = if columns.is_empty() {
                format!(
                    "INSERT INTO {table} DEFAULT VALUES RETURNING to_jsonb({table}.*)",
                    table = table.name()
                )
            } else {
                format!(
                    "INSERT INTO {table} ({cols}) \
                     SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) \
                     RETURNING to_jsonb({table}.*)",
                    table = table.name(),
                    cols = column_list(&columns)
                )
            };

            let (value,): (Value,) = sqlx::query_as(&sql)
                .bind(Json(Value::Object(row)))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_error(table, e))?;
            stored.push(value);
        }

        tx.commit().await.map_err(|e| map_error(table, e))?;
        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, BackendError> {
        let patch = table.writable_row(patch)?;
        let columns: Vec<String> = patch.keys().cloned().collect();

        let mut assignments = Vec::new();
        if !columns.is_empty() {
            assignments.push(format!(
                "({cols}) = (SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $2))",
                cols = column_list(&columns),
                table = table.name()
            ));
        }
        if table.has_updated_at() {
            assignments.push("\"updated_at\" = now()".to_string());
        }
        if assignments.is_empty() {
            assignments.push("\"id\" = \"id\"".to_string());
        }

        let sql = format!(
            "UPDATE {table} SET {set} WHERE \"id\"::text = $1 RETURNING to_jsonb({table}.*)",
            table = table.name(),
            set = assignments.join(", ")
        );

        let mut statement = sqlx::query_as::<_, (Value,)>(&sql).bind(id);
        if !columns.is_empty() {
            statement = statement.bind(Json(Value::Object(patch)));
        }
        let row = statement
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(|e| map_error(table, e))?;

        row.map(|(value,)| value).ok_or_else(|| BackendError::NotFound {
            table: table.name(),
            id: id.to_string(),
        })
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), BackendError> {
        let sql = format!("DELETE FROM {} WHERE \"id\"::text = $1", table.name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| map_error(table, e))?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound {
                table: table.name(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<Duration, BackendError> {
        let start = std::time::Instant::now();
        sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await?;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(config.max_connections >= 1);
        assert!(config.connect_timeout_secs >= 1);
        assert!(config.idle_timeout_secs >= 1);
        assert!(!config.url.is_empty());
    }

    #[test]
    fn test_select_sql_shape() {
        let query = Query::new(Table::Projects)
            .join(Table::ProjectCategories, "category_id", &["name", "slug"])
            .eq("show_on_home", true)
            .order("created_at", false)
            .limit(4);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push("to_jsonb(t.*)");
        if let Some(join) = &query.join {
            push_object(&mut qb, "r", join.columns);
        }
        push_filter(&mut qb, "show_on_home", &Value::Bool(true));
        let sql = qb.sql();

        assert!(sql.contains("jsonb_build_object('name', r.\"name\", 'slug', r.\"slug\")"));
        assert!(sql.contains("t.\"show_on_home\" = $1"));
    }

    #[test]
    fn test_column_list_quotes_identifiers() {
        let cols = vec!["title".to_string(), "category_id".to_string()];
        assert_eq!(column_list(&cols), "\"title\", \"category_id\"");
    }
}
