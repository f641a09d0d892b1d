//! Handle to the hosted data platform: relational tables, auth and file storage.
//!
//! Rows cross this boundary as JSON objects keyed by column name. The query
//! surface mirrors what the site needs: column selection, one joined relation,
//! equality filters, a single ordering and a row limit.

pub mod auth;
pub mod memory;
pub mod postgres;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AppConfig;
use auth::AuthService;
use memory::MemoryDatabase;
use storage::MemoryStorage;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unknown column {column} on {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("row in {table} with id {id} not found")]
    NotFound { table: &'static str, id: String },

    #[error("{table}.{column} references a missing or still-referenced row")]
    ForeignKey { table: &'static str, column: &'static str },

    #[error("duplicate value for {table}.{column}")]
    UniqueViolation { table: &'static str, column: &'static str },

    #[error("{table}.{column} must not be null")]
    NotNull { table: &'static str, column: &'static str },

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tables known to the platform. `AuthUsers` belongs to the auth service and
/// is never exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Projects,
    ProjectCategories,
    Services,
    Reviews,
    Profiles,
    AuthUsers,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Projects => "projects",
            Table::ProjectCategories => "project_categories",
            Table::Services => "services",
            Table::Reviews => "reviews",
            Table::Profiles => "profiles",
            Table::AuthUsers => "auth_users",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Projects => &[
                "id",
                "title",
                "description",
                "image_url",
                "thumbnail_url",
                "images",
                "demo_url",
                "code_url",
                "instagram_url",
                "youtube_views",
                "brand_name",
                "client_name",
                "project_date",
                "social_date",
                "social_links",
                "metadata",
                "show_on_home",
                "is_featured",
                "category_id",
                "created_at",
                "updated_at",
            ],
            Table::ProjectCategories => &["id", "name", "slug", "description", "created_at"],
            Table::Services => &[
                "id",
                "title",
                "description",
                "icon",
                "is_featured",
                "created_at",
                "updated_at",
            ],
            Table::Reviews => &[
                "id",
                "client_name",
                "client_image",
                "rating",
                "review_text",
                "project_type",
                "is_featured",
                "created_at",
                "updated_at",
            ],
            Table::Profiles => &["id", "user_id", "email", "role", "created_at", "updated_at"],
            Table::AuthUsers => &[
                "id",
                "email",
                "password_hash",
                "email_confirmed",
                "created_at",
                "updated_at",
            ],
        }
    }

    /// Columns that are NOT NULL without a server default.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            Table::Projects => &["title", "category_id"],
            Table::ProjectCategories => &["name", "slug"],
            Table::Services => &["title"],
            Table::Reviews => &["client_name", "review_text"],
            Table::Profiles => &["user_id", "email"],
            Table::AuthUsers => &["email", "password_hash"],
        }
    }

    /// Server-side column defaults applied when an insert omits the column.
    pub fn defaults(self) -> &'static [(&'static str, DefaultValue)] {
        match self {
            Table::Projects => &[
                ("images", DefaultValue::EmptyArray),
                ("show_on_home", DefaultValue::Bool(false)),
                ("is_featured", DefaultValue::Bool(false)),
            ],
            Table::Services | Table::Reviews => &[("is_featured", DefaultValue::Bool(false))],
            Table::Profiles => &[("role", DefaultValue::Text("user"))],
            Table::AuthUsers => &[("email_confirmed", DefaultValue::Bool(false))],
            Table::ProjectCategories => &[],
        }
    }

    pub fn unique(self) -> &'static [&'static str] {
        match self {
            Table::ProjectCategories => &["slug"],
            Table::AuthUsers => &["email"],
            _ => &[],
        }
    }

    pub fn has_updated_at(self) -> bool {
        self.columns().contains(&"updated_at")
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Columns the platform owns; writes to them are ignored.
    pub fn is_server_managed(column: &str) -> bool {
        matches!(column, "id" | "created_at" | "updated_at")
    }

    fn check_column(self, column: &str) -> Result<(), BackendError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(BackendError::UnknownColumn {
                table: self.name(),
                column: column.to_string(),
            })
        }
    }

    /// Checks every key of a row object against this table and strips
    /// server-managed columns.
    pub fn writable_row(
        self,
        row: Value,
    ) -> Result<serde_json::Map<String, Value>, BackendError> {
        let Value::Object(mut map) = row else {
            return Err(BackendError::InvalidRow(format!(
                "expected an object for {}",
                self.name()
            )));
        };
        map.retain(|column, _| !Table::is_server_managed(column));
        for column in map.keys() {
            self.check_column(column)?;
        }
        Ok(map)
    }

    /// [`Table::writable_row`] for inserts: a defaulted column that is absent
    /// or explicitly `null` takes its default.
    pub fn insertable_row(
        self,
        row: Value,
    ) -> Result<serde_json::Map<String, Value>, BackendError> {
        let mut map = self.writable_row(row)?;
        for (column, default) in self.defaults() {
            if map.get(*column).is_none_or(Value::is_null) {
                map.insert(column.to_string(), default.to_json());
            }
        }
        Ok(map)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Bool(bool),
    Text(&'static str),
    EmptyArray,
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Text(s) => Value::String(s.to_string()),
            DefaultValue::EmptyArray => Value::Array(Vec::new()),
        }
    }
}

/// A many-to-one relation embedded in each selected row under the related
/// table's name, e.g. `project_categories: { name, slug }`.
#[derive(Debug, Clone)]
pub struct Join {
    pub relation: Table,
    pub foreign_key: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub table: Table,
    pub columns: Option<Vec<&'static str>>,
    pub join: Option<Join>,
    pub filters: Vec<(&'static str, Value)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            columns: None,
            join: None,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &[&'static str]) -> Self {
        self.columns = Some(columns.to_vec());
        self
    }

    pub fn join(mut self, relation: Table, foreign_key: &'static str, columns: &'static [&'static str]) -> Self {
        self.join = Some(Join {
            relation,
            foreign_key,
            columns,
        });
        self
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    pub fn order(mut self, column: &'static str, ascending: bool) -> Self {
        self.order = Some(Order { column, ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rejects any column the target tables do not have.
    pub fn validate(&self) -> Result<(), BackendError> {
        if let Some(columns) = &self.columns {
            for column in columns {
                self.table.check_column(column)?;
            }
        }
        if let Some(join) = &self.join {
            self.table.check_column(join.foreign_key)?;
            for column in join.columns {
                join.relation.check_column(column)?;
            }
        }
        for (column, _) in &self.filters {
            self.table.check_column(column)?;
        }
        if let Some(order) = &self.order {
            self.table.check_column(order.column)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError>;

    /// Inserts all rows or none. Returns the stored rows with generated columns.
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError>;

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, BackendError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), BackendError>;

    /// Round-trip latency check used by the health routes.
    async fn ping(&self) -> Result<Duration, BackendError>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Configured handle bundling the database, storage and auth seams.
#[derive(Clone)]
pub struct BackendClient {
    db: Arc<dyn Database>,
    storage: Arc<dyn Storage>,
    auth: Arc<AuthService>,
}

impl BackendClient {
    pub fn new(db: Arc<dyn Database>, storage: Arc<dyn Storage>, config: &AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(db.clone(), config));
        Self { db, storage, auth }
    }

    /// Fully in-process backend: memory tables and memory storage.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(MemoryDatabase::new()),
            Arc::new(MemoryStorage::new(&config.public_base_url)),
            config,
        )
    }

    pub fn from(&self, table: Table) -> Query {
        Query::new(table)
    }

    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn auth(&self) -> &AuthService {
        self.auth.as_ref()
    }
}
