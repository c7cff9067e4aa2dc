use std::any::Any;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SimError;
use crate::ident::ResourceKey;
use crate::server::envelope::{
    self, Collection, MEMBER_COLLECTION_KIND, POOL_COLLECTION_KIND, VIRTUAL_COLLECTION_KIND,
};
use crate::server::extract::{AuthenticatedUser, JsonBody};
use crate::server::state::AppState;
use crate::store::record::members_link;
use crate::store::{NewPool, NewVirtual};

type JsonResult = Result<Json<Value>, SimError>;

fn to_json(value: impl serde::Serialize) -> JsonResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| SimError::Internal(e.into()))
}

fn created(value: impl serde::Serialize) -> Result<(StatusCode, Json<Value>), SimError> {
    to_json(value).map(|json| (StatusCode::CREATED, json))
}

// ============================================================================
// Unauthenticated endpoints
// ============================================================================

/// Liveness check with a credential hint
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(envelope::root_status(state.credentials()))
}

/// Exchange username/password for a token
pub async fn login(State(state): State<AppState>, body: JsonBody) -> JsonResult {
    let body = body.require()?;

    let username = body.get("username").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    let provider = body.get("loginProviderName").and_then(Value::as_str);

    let (Some(username), Some(password)) = (username, password) else {
        warn!("Login attempt without username or password");
        return Err(SimError::AuthenticationFailed);
    };

    let token = state.auth.login(username, password, provider)?;
    Ok(Json(envelope::login_response(&token)))
}

pub async fn token_info(State(state): State<AppState>, Path(token): Path<String>) -> JsonResult {
    let token = state.auth.token_info(&token)?;
    Ok(Json(envelope::token_descriptor(&token)))
}

// ============================================================================
// System information
// ============================================================================

pub async fn sys_info(_user: AuthenticatedUser) -> Json<Value> {
    info!("System info requested");
    Json(envelope::sys_catalog())
}

pub async fn global_settings(_user: AuthenticatedUser) -> Json<Value> {
    Json(envelope::global_settings())
}

// ============================================================================
// Pools
// ============================================================================

pub async fn list_pools(_user: AuthenticatedUser, State(state): State<AppState>) -> JsonResult {
    to_json(Collection::new(
        POOL_COLLECTION_KIND,
        "/mgmt/tm/ltm/pool",
        state.store.list_pools(),
    ))
}

pub async fn create_pool(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<Value>), SimError> {
    let pool = NewPool::from_body(&body.require()?)?;
    created(state.store.create_pool(pool))
}

pub async fn get_pool(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult {
    to_json(state.store.get_pool(&ResourceKey::parse(&id))?)
}

pub async fn update_pool(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> JsonResult {
    to_json(state.store.update_pool(&ResourceKey::parse(&id), body.or_empty())?)
}

pub async fn delete_pool(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult {
    state.store.delete_pool(&ResourceKey::parse(&id))?;
    Ok(Json(envelope::deleted()))
}

// ============================================================================
// Pool members
// ============================================================================

pub async fn list_members(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult {
    let pool = ResourceKey::parse(&id);
    let members = state.store.list_members(&pool)?;
    to_json(Collection::new(
        MEMBER_COLLECTION_KIND,
        members_link(&pool),
        members,
    ))
}

pub async fn create_member(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<(StatusCode, Json<Value>), SimError> {
    let pool = ResourceKey::parse(&id);
    // Pool existence is reported ahead of a missing body
    state.store.get_pool(&pool)?;
    let body = body.require()?;
    created(state.store.create_member(&pool, &body)?)
}

pub async fn get_member(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
) -> JsonResult {
    to_json(state.store.get_member(&ResourceKey::parse(&id), &member)?)
}

pub async fn update_member(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
    body: JsonBody,
) -> JsonResult {
    to_json(
        state
            .store
            .update_member(&ResourceKey::parse(&id), &member, body.or_empty())?,
    )
}

pub async fn delete_member(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
) -> JsonResult {
    state.store.delete_member(&ResourceKey::parse(&id), &member)?;
    Ok(Json(envelope::deleted()))
}

// ============================================================================
// Virtual servers
// ============================================================================

pub async fn list_virtuals(_user: AuthenticatedUser, State(state): State<AppState>) -> JsonResult {
    to_json(Collection::new(
        VIRTUAL_COLLECTION_KIND,
        "/mgmt/tm/ltm/virtual",
        state.store.list_virtuals(),
    ))
}

pub async fn create_virtual(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<Value>), SimError> {
    let virtual_server = NewVirtual::from_body(&body.require()?)?;
    created(state.store.create_virtual(virtual_server))
}

pub async fn get_virtual(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult {
    to_json(state.store.get_virtual(&ResourceKey::parse(&id))?)
}

pub async fn update_virtual(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> JsonResult {
    to_json(
        state
            .store
            .update_virtual(&ResourceKey::parse(&id), body.or_empty())?,
    )
}

pub async fn delete_virtual(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> JsonResult {
    state.store.delete_virtual(&ResourceKey::parse(&id))?;
    Ok(Json(envelope::deleted()))
}

// ============================================================================
// Fallbacks
// ============================================================================

/// Any request no route accepts
pub async fn unmatched(method: Method, uri: Uri) -> SimError {
    warn!("Unmapped endpoint: {} {}", method, uri.path());
    SimError::UnmatchedRoute {
        method,
        path: uri.path().to_string(),
    }
}

/// Turn a handler panic into a 500 instead of dropping the connection
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    SimError::Internal(anyhow::anyhow!(detail)).into_response()
}
