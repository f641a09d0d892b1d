/**
 * Admin Routes
 * Dashboard snapshot and content management. Every route here sits behind
 * the admin gate.
 */
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::auth::User;
use crate::content::{self, fetch_list, Entity, EntityList, Flag, Notification};
use crate::dashboard::{Dashboard, DashboardSnapshot};
use crate::form::{CategoryDraft, Draft, ProjectDraft, ReviewDraft, ServiceDraft};
use crate::routes::{api_error, content_error, upload, ApiError};
use crate::session::AdminGate;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: User,
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
    pub notifications: Vec<Notification>,
}

/// Outcome of a mutation plus the refreshed collection.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub notification: Notification,
    pub data: EntityList,
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub value: bool,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_draft<D: DeserializeOwned>(body: Value) -> Result<D, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "Invalid request body", Some(e.to_string())))
}

async fn create_as<D: Draft + DeserializeOwned>(state: &AppState, body: Value) -> Result<(), Response> {
    let draft: D = parse_draft(body).map_err(IntoResponse::into_response)?;
    content::create(&state.client, &draft)
        .await
        .map(drop)
        .map_err(|e| content_error(e).into_response())
}

async fn update_as<D: Draft + DeserializeOwned>(
    state: &AppState,
    id: &str,
    body: Value,
) -> Result<(), Response> {
    let draft: D = parse_draft(body).map_err(IntoResponse::into_response)?;
    content::update(&state.client, id, &draft)
        .await
        .map(drop)
        .map_err(|e| content_error(e).into_response())
}

/// Re-fetches the collection after a successful mutation.
async fn respond_with_list(
    state: &AppState,
    entity: Entity,
    status: StatusCode,
    notification: Notification,
) -> Response {
    match fetch_list(&state.client, entity).await {
        Ok(data) => (status, Json(MutationResponse { notification, data })).into_response(),
        Err(e) => content_error(e).into_response(),
    }
}

async fn toggle(state: &AppState, entity: Entity, id: &str, flag: Flag, value: bool) -> Response {
    match content::set_flag(&state.client, entity, id, flag, value).await {
        Ok(_) => respond_with_list(state, entity, StatusCode::OK, Notification::updated(entity)).await,
        Err(e) => content_error(e).into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /admin
pub async fn dashboard(State(state): State<AppState>, AdminGate(user): AdminGate) -> impl IntoResponse {
    let mut dashboard = Dashboard::new(state.client.clone(), state.config.image_bucket.clone());
    dashboard.load().await;

    Json(DashboardResponse {
        user,
        snapshot: dashboard.snapshot(),
        notifications: dashboard.take_notifications(),
    })
}

/// GET /api/admin/{entity}
pub async fn list(State(state): State<AppState>, Path(entity): Path<Entity>) -> impl IntoResponse {
    match fetch_list(&state.client, entity).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => content_error(e).into_response(),
    }
}

/// POST /api/admin/{entity}
pub async fn create(
    State(state): State<AppState>,
    Path(entity): Path<Entity>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let result = match entity {
        Entity::Projects => create_as::<ProjectDraft>(&state, body).await,
        Entity::Categories => create_as::<CategoryDraft>(&state, body).await,
        Entity::Services => create_as::<ServiceDraft>(&state, body).await,
        Entity::Reviews => create_as::<ReviewDraft>(&state, body).await,
    };
    if let Err(response) = result {
        return response;
    }
    respond_with_list(&state, entity, StatusCode::CREATED, Notification::added(entity)).await
}

/// PUT /api/admin/{entity}/{id}
pub async fn update(
    State(state): State<AppState>,
    Path((entity, id)): Path<(Entity, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let result = match entity {
        Entity::Projects => update_as::<ProjectDraft>(&state, &id, body).await,
        Entity::Categories => update_as::<CategoryDraft>(&state, &id, body).await,
        Entity::Services => update_as::<ServiceDraft>(&state, &id, body).await,
        Entity::Reviews => update_as::<ReviewDraft>(&state, &id, body).await,
    };
    if let Err(response) = result {
        return response;
    }
    respond_with_list(&state, entity, StatusCode::OK, Notification::updated(entity)).await
}

/// DELETE /api/admin/{entity}/{id}
pub async fn remove(State(state): State<AppState>, Path((entity, id)): Path<(Entity, String)>) -> impl IntoResponse {
    if let Err(e) = content::delete(&state.client, entity, &id).await {
        return content_error(e).into_response();
    }
    respond_with_list(&state, entity, StatusCode::OK, Notification::deleted(entity)).await
}

/// PATCH /api/admin/{entity}/{id}/home
pub async fn set_show_on_home(
    State(state): State<AppState>,
    Path((entity, id)): Path<(Entity, String)>,
    Json(payload): Json<FlagRequest>,
) -> impl IntoResponse {
    toggle(&state, entity, &id, Flag::ShowOnHome, payload.value).await
}

/// PATCH /api/admin/{entity}/{id}/featured
pub async fn set_featured(
    State(state): State<AppState>,
    Path((entity, id)): Path<(Entity, String)>,
    Json(payload): Json<FlagRequest>,
) -> impl IntoResponse {
    toggle(&state, entity, &id, Flag::Featured, payload.value).await
}

/// Gated dashboard router: anonymous and non-admin callers are redirected to
/// the login page before any handler runs.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route(
            "/api/admin/uploads",
            post(upload::upload_images).layer(DefaultBodyLimit::max(upload::UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/admin/uploads/thumbnail",
            post(upload::upload_thumbnail).layer(DefaultBodyLimit::max(upload::UPLOAD_BODY_LIMIT)),
        )
        .route("/api/admin/{entity}", get(list).post(create))
        .route("/api/admin/{entity}/{id}", put(update).delete(remove))
        .route("/api/admin/{entity}/{id}/home", patch(set_show_on_home))
        .route("/api/admin/{entity}/{id}/featured", patch(set_featured))
        .route_layer(middleware::from_extractor_with_state::<AdminGate, AppState>(state))
}
