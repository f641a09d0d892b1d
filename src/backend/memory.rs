//! In-process table store with the same row semantics as the Postgres store:
//! generated ids and timestamps, column defaults, NOT NULL, unique and
//! foreign-key checks.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendError, Database, Query, Table};

type Row = Map<String, Value>;

#[derive(Default)]
struct Tables {
    rows: HashMap<Table, Vec<Row>>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Tables {
    fn rows(&self, table: Table) -> &[Row] {
        self.rows.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Strictly increasing timestamps so creation order is always recoverable.
    fn next_stamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn find(&self, table: Table, id: &str) -> Option<usize> {
        self.rows(table)
            .iter()
            .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
    }

    fn check_row(&self, table: Table, row: &Row, skip_id: Option<&str>) -> Result<(), BackendError> {
        for &column in table.required() {
            if row.get(column).is_none_or(Value::is_null) {
                return Err(BackendError::NotNull {
                    table: table.name(),
                    column,
                });
            }
        }

        for &column in table.unique() {
            let Some(value) = row.get(column) else {
                continue;
            };
            let taken = self.rows(table).iter().any(|other| {
                other.get("id").and_then(Value::as_str) != skip_id && other.get(column) == Some(value)
            });
            if taken {
                return Err(BackendError::UniqueViolation {
                    table: table.name(),
                    column,
                });
            }
        }

        if table == Table::Projects {
            let category = row.get("category_id").and_then(Value::as_str);
            let exists = category
                .map(|id| self.find(Table::ProjectCategories, id).is_some())
                .unwrap_or(false);
            if !exists {
                return Err(BackendError::ForeignKey {
                    table: table.name(),
                    column: "category_id",
                });
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Postgres ordering: NULLs sort as larger than any value.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn matches_filters(row: &Row, filters: &[(&'static str, Value)]) -> bool {
    filters.iter().all(|(column, expected)| match expected {
        Value::Null => row.get(*column).is_none_or(Value::is_null),
        other => row.get(*column) == Some(other),
    })
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        query.validate()?;
        let tables = self.tables.read().await;

        let mut rows: Vec<&Row> = tables
            .rows(query.table)
            .iter()
            .filter(|row| matches_filters(row, &query.filters))
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(order.column), b.get(order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        let out = rows
            .into_iter()
            .map(|row| {
                let mut selected = match &query.columns {
                    Some(columns) => columns
                        .iter()
                        .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
                        .collect::<Row>(),
                    None => row.clone(),
                };

                if let Some(join) = &query.join {
                    let related = row
                        .get(join.foreign_key)
                        .and_then(Value::as_str)
                        .and_then(|id| tables.find(join.relation, id))
                        .map(|idx| {
                            let target = &tables.rows(join.relation)[idx];
                            Value::Object(
                                join.columns
                                    .iter()
                                    .map(|c| (c.to_string(), target.get(*c).cloned().unwrap_or(Value::Null)))
                                    .collect(),
                            )
                        })
                        .unwrap_or(Value::Null);
                    selected.insert(join.relation.name().to_string(), related);
                }

                Value::Object(selected)
            })
            .collect();

        Ok(out)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let mut tables = self.tables.write().await;

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let row = table.insertable_row(row)?;
            tables.check_row(table, &row, None)?;
            // Rows of the same batch must not collide with each other either.
            for &column in table.unique() {
                let dup = prepared
                    .iter()
                    .any(|other: &Row| row.get(column).is_some() && other.get(column) == row.get(column));
                if dup {
                    return Err(BackendError::UniqueViolation {
                        table: table.name(),
                        column,
                    });
                }
            }
            prepared.push(row);
        }

        let mut stored = Vec::with_capacity(prepared.len());
        for mut row in prepared {
            let stamp = tables.next_stamp();
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            row.insert("created_at".to_string(), Value::String(stamp.clone()));
            if table.has_updated_at() {
                row.insert("updated_at".to_string(), Value::String(stamp));
            }
            for column in table.columns() {
                row.entry(column.to_string()).or_insert(Value::Null);
            }
            stored.push(Value::Object(row.clone()));
            tables.rows.entry(table).or_default().push(row);
        }

        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, BackendError> {
        let patch = table.writable_row(patch)?;
        let mut tables = self.tables.write().await;

        let idx = tables.find(table, id).ok_or_else(|| BackendError::NotFound {
            table: table.name(),
            id: id.to_string(),
        })?;

        let mut row = tables.rows(table)[idx].clone();
        for (column, value) in patch {
            row.insert(column, value);
        }
        tables.check_row(table, &row, Some(id))?;
        if table.has_updated_at() {
            let stamp = tables.next_stamp();
            row.insert("updated_at".to_string(), Value::String(stamp));
        }

        let out = Value::Object(row.clone());
        if let Some(rows) = tables.rows.get_mut(&table) {
            rows[idx] = row;
        }
        Ok(out)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), BackendError> {
        let mut tables = self.tables.write().await;

        let idx = tables.find(table, id).ok_or_else(|| BackendError::NotFound {
            table: table.name(),
            id: id.to_string(),
        })?;

        if table == Table::ProjectCategories {
            let referenced = tables
                .rows(Table::Projects)
                .iter()
                .any(|p| p.get("category_id").and_then(Value::as_str) == Some(id));
            if referenced {
                return Err(BackendError::ForeignKey {
                    table: Table::Projects.name(),
                    column: "category_id",
                });
            }
        }

        if let Some(rows) = tables.rows.get_mut(&table) {
            rows.remove(idx);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<Duration, BackendError> {
        let start = std::time::Instant::now();
        let _guard = self.tables.read().await;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seed_category(db: &MemoryDatabase, name: &str, slug: &str) -> String {
        let rows = db
            .insert(Table::ProjectCategories, vec![json!({ "name": name, "slug": slug })])
            .await
            .unwrap();
        rows[0]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_timestamps_and_defaults() {
        let db = MemoryDatabase::new();
        let category = seed_category(&db, "Graphic Design", "graphic-design").await;

        let rows = db
            .insert(
                Table::Projects,
                vec![json!({ "title": "Logo Pack", "category_id": category })],
            )
            .await
            .unwrap();

        let row = &rows[0];
        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(row["created_at"], row["updated_at"]);
        assert_eq!(row["show_on_home"], json!(false));
        assert_eq!(row["images"], json!([]));
        assert_eq!(row["client_name"], Value::Null);
    }

    #[tokio::test]
    async fn test_insert_enforces_foreign_key_and_not_null() {
        let db = MemoryDatabase::new();
        let missing = Uuid::new_v4().to_string();

        let err = db
            .insert(Table::Projects, vec![json!({ "title": "X", "category_id": missing })])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ForeignKey { .. }));

        let err = db
            .insert(Table::Services, vec![json!({ "description": "no title" })])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotNull { column: "title", .. }));
    }

    #[tokio::test]
    async fn test_insert_batch_is_all_or_nothing() {
        let db = MemoryDatabase::new();
        let err = db
            .insert(
                Table::ProjectCategories,
                vec![
                    json!({ "name": "A", "slug": "same" }),
                    json!({ "name": "B", "slug": "same" }),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UniqueViolation { .. }));

        let rows = db.select(&Query::new(Table::ProjectCategories)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_select_join_filter_order_limit() {
        let db = MemoryDatabase::new();
        let category = seed_category(&db, "Video Editing", "video-editing").await;
        for i in 0..5 {
            db.insert(
                Table::Projects,
                vec![json!({ "title": format!("P{i}"), "category_id": category, "show_on_home": i % 2 == 0 })],
            )
            .await
            .unwrap();
        }

        let query = Query::new(Table::Projects)
            .join(Table::ProjectCategories, "category_id", &["name", "slug"])
            .eq("show_on_home", true)
            .order("created_at", false)
            .limit(2);
        let rows = db.select(&query).await.unwrap();

        let titles: Vec<_> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["P4", "P2"]);
        assert_eq!(rows[0]["project_categories"]["slug"], json!("video-editing"));
    }

    #[tokio::test]
    async fn test_select_column_subset() {
        let db = MemoryDatabase::new();
        seed_category(&db, "B", "b").await;
        seed_category(&db, "A", "a").await;

        let rows = db
            .select(&Query::new(Table::ProjectCategories).select(&["name"]).order("name", true))
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({ "name": "A" }), json!({ "name": "B" })]);
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_updated_at() {
        let db = MemoryDatabase::new();
        let rows = db
            .insert(Table::Services, vec![json!({ "title": "Editing" })])
            .await
            .unwrap();
        let id = rows[0]["id"].as_str().unwrap();

        let updated = db
            .update(Table::Services, id, json!({ "is_featured": true, "id": "ignored" }))
            .await
            .unwrap();
        assert_eq!(updated["title"], json!("Editing"));
        assert_eq!(updated["is_featured"], json!(true));
        assert_eq!(updated["id"], rows[0]["id"]);
        assert!(updated["updated_at"].as_str() > rows[0]["updated_at"].as_str());

        let err = db
            .update(Table::Services, &Uuid::new_v4().to_string(), json!({ "title": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_restricts_referenced_category() {
        let db = MemoryDatabase::new();
        let category = seed_category(&db, "Web", "website-development").await;
        let rows = db
            .insert(Table::Projects, vec![json!({ "title": "Site", "category_id": category })])
            .await
            .unwrap();

        assert!(db.delete(Table::ProjectCategories, &category).await.is_err());

        db.delete(Table::Projects, rows[0]["id"].as_str().unwrap())
            .await
            .unwrap();
        db.delete(Table::ProjectCategories, &category).await.unwrap();
        assert!(db.select(&Query::new(Table::Projects)).await.unwrap().is_empty());
    }

    #[test]
    fn test_compare_values_sorts_nulls_last() {
        let a = json!(1);
        let b = json!(2);
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&b)), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!("a")), Some(&json!("b"))), Ordering::Less);
    }
}
