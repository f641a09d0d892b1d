use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ContentError, Entity};
use crate::backend::BackendClient;
use crate::form::Draft;

/// Validates locally, then inserts. Nothing reaches the backend when
/// validation fails.
pub async fn create<D: Draft>(client: &BackendClient, draft: &D) -> Result<Value, ContentError> {
    let entity = D::ENTITY;
    draft.validate().inspect_err(|e| {
        tracing::debug!(entity = entity.plural(), error = %e, "create rejected");
    })?;

    let mut rows = client
        .db()
        .insert(entity.table(), vec![draft.to_row()])
        .await
        .map_err(|source| {
            tracing::error!(entity = entity.plural(), error = %source, "create failed");
            ContentError::Create { entity, source }
        })?;

    tracing::info!(entity = entity.plural(), "row created");
    Ok(rows.pop().unwrap_or(Value::Null))
}

pub async fn update<D: Draft>(client: &BackendClient, id: &str, draft: &D) -> Result<Value, ContentError> {
    let entity = D::ENTITY;
    draft.validate()?;

    let row = client
        .db()
        .update(entity.table(), id, draft.to_row())
        .await
        .map_err(|source| {
            tracing::error!(entity = entity.plural(), id = %id, error = %source, "update failed");
            ContentError::Update { entity, source }
        })?;

    tracing::info!(entity = entity.plural(), id = %id, "row updated");
    Ok(row)
}

/// Hard delete by id.
pub async fn delete(client: &BackendClient, entity: Entity, id: &str) -> Result<(), ContentError> {
    client
        .db()
        .delete(entity.table(), id)
        .await
        .map_err(|source| {
            tracing::error!(entity = entity.plural(), id = %id, error = %source, "delete failed");
            ContentError::Delete { entity, source }
        })?;

    tracing::info!(entity = entity.plural(), id = %id, "row deleted");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    ShowOnHome,
    Featured,
}

impl Flag {
    pub fn column(self) -> &'static str {
        match self {
            Flag::ShowOnHome => "show_on_home",
            Flag::Featured => "is_featured",
        }
    }

    pub fn applies_to(self, entity: Entity) -> bool {
        match self {
            Flag::ShowOnHome => entity == Entity::Projects,
            Flag::Featured => entity != Entity::Categories,
        }
    }
}

/// Single-column update of a boolean badge.
pub async fn set_flag(
    client: &BackendClient,
    entity: Entity,
    id: &str,
    flag: Flag,
    value: bool,
) -> Result<Value, ContentError> {
    if !flag.applies_to(entity) {
        return Err(ContentError::UnsupportedFlag {
            entity,
            column: flag.column(),
        });
    }

    client
        .db()
        .update(entity.table(), id, json!({ flag.column(): value }))
        .await
        .map_err(|source| {
            tracing::error!(entity = entity.plural(), id = %id, error = %source, "flag update failed");
            ContentError::Update { entity, source }
        })
}

pub async fn set_show_on_home(client: &BackendClient, id: &str, value: bool) -> Result<Value, ContentError> {
    set_flag(client, Entity::Projects, id, Flag::ShowOnHome, value).await
}

pub async fn set_featured(
    client: &BackendClient,
    entity: Entity,
    id: &str,
    value: bool,
) -> Result<Value, ContentError> {
    set_flag(client, entity, id, Flag::Featured, value).await
}
