//! HTTP route handlers for the RSVP server.
//!
//! This module provides the HTTP API endpoints, all under the `/api` prefix:
//!
//! - `POST /api/auth` - Credential check, reports the resolved role
//! - `GET/POST /api/events` - List events / create an event (admin)
//! - `PUT/DELETE /api/events/{id}` - Update an event / delete one (admin)
//! - `GET/POST /api/users` - List users / register a user
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`]: the configuration
//! (including the two role secrets) and the key-value store handle. A gate
//! layer rejects every request that resolves to no role with 401 before
//! routing happens at all; only the credential check and OPTIONS requests are
//! exempt. Unknown paths and unsupported methods therefore read as 401, not
//! 404 or 405, when the caller is unauthenticated.
//!
//! Collection mutations follow the store's read-modify-write shape: load the
//! whole collection, mutate in memory, write the whole collection back. The
//! pair is not atomic; see [`crate::store`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::{bearer_token, resolve_role, role_for_token, AuthError};
use crate::config::Config;
use crate::error::ApiError;
use crate::store::{load_collection, save_collection, KvStore};
use crate::types::{Event, NewEvent, NewUser, Role, User, EVENTS_KEY, USERS_KEY};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Key-value store holding the two collections.
    pub store: Arc<dyn KvStore>,
}

impl AppState {
    /// Creates a new application state from a configuration and a store.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn KvStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("store", &"<KvStore>")
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// Outermost, every OPTIONS request is answered with an empty 204 carrying
/// the CORS headers, before anything else runs. All other requests pass
/// through the CORS layer, then the authentication gate: requests that
/// resolve to no role are rejected with 401 before routing, so an
/// unauthenticated caller sees 401 even for unknown paths and unsupported
/// methods. Only `POST /api/auth` bypasses the gate, so it can report its
/// own, more specific 401 messages. Authenticated requests that match no
/// route fall back to a JSON 404; a matched path with an unsupported method
/// yields a JSON 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth", post(post_auth))
        .route("/api/events", get(get_events).post(post_events))
        .route("/api/events/{id}", put(put_event).delete(delete_event))
        .route("/api/users", get(get_users).post(post_users))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(preflight_short_circuit))
        .with_state(state)
}

/// CORS policy: any origin, the four data methods plus OPTIONS, and the
/// Content-Type/Authorization request headers.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Answers OPTIONS requests to any path with an empty 204, unconditionally
/// and before authentication.
///
/// This layer sits outside the CORS layer (which would otherwise answer
/// preflights itself, with 200), so the 204 carries the CORS headers
/// directly.
async fn preflight_short_circuit(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
        return response;
    }
    next.run(request).await
}

/// Rejects requests that resolve to no role with 401 before routing.
///
/// The credential check endpoint handles its own authentication so it can
/// distinguish a missing header from an unrecognized secret; everything
/// else, including requests that would otherwise land on the 404/405
/// fallbacks, requires a valid bearer secret. OPTIONS requests never reach
/// this layer.
async fn auth_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let is_auth_check =
        request.method() == Method::POST && request.uri().path() == "/api/auth";
    if !is_auth_check && resolve_role(request.headers(), &state.config).is_none() {
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

/// Fallback for unmatched paths.
async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Fallback for matched paths with an unsupported method.
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// ============================================================================
// Authentication Helpers
// ============================================================================

/// Resolves the caller's role or rejects the request with 401.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Role, ApiError> {
    resolve_role(headers, &state.config).ok_or_else(ApiError::unauthorized)
}

/// Rejects non-admin callers with 403.
fn require_admin(role: Role) -> Result<(), ApiError> {
    if role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Parses a request body, surfacing the parser's message as a 500 like the
/// rest of the unhandled-failure paths.
fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Internal(e.to_string()))
}

// ============================================================================
// POST /api/auth - Credential Check
// ============================================================================

/// Response body for a successful credential check.
#[derive(Debug, Serialize)]
struct AuthResponse {
    role: Role,
}

/// POST /api/auth - Reports the role a bearer credential resolves to.
///
/// This endpoint performs no store access. A missing or malformed
/// Authorization header and an unrecognized credential both yield 401, with
/// distinct messages.
async fn post_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized(AuthError::MissingCredentials.to_string()))?;

    let role = role_for_token(token, &state.config)
        .ok_or_else(|| ApiError::Unauthorized(AuthError::InvalidCredentials.to_string()))?;

    debug!(role = %role, "Credential check succeeded");
    Ok(Json(AuthResponse { role }))
}

// ============================================================================
// /api/events - Events Collection
// ============================================================================

/// GET /api/events - Returns the full events collection.
///
/// Any authenticated role. An absent store key reads as an empty list.
async fn get_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Event>>, ApiError> {
    authenticate(&state, &headers)?;

    let events: Vec<Event> = load_collection(state.store.as_ref(), EVENTS_KEY).await?;
    Ok(Json(events))
}

/// POST /api/events - Creates an event. Admin only.
///
/// Assigns a fresh time-based identifier and an empty RSVP list, appends the
/// event to the collection and persists it whole. Returns the created event
/// with 201.
async fn post_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let role = authenticate(&state, &headers)?;
    require_admin(role)?;

    let new_event: NewEvent = parse_body(&body)?;
    let event = Event::create(new_event.fields);

    let mut events: Vec<Event> = load_collection(state.store.as_ref(), EVENTS_KEY).await?;
    events.push(event.clone());
    save_collection(state.store.as_ref(), EVENTS_KEY, &events).await?;

    info!(event_id = %event.id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

// ============================================================================
// /api/events/{id} - Single Event
// ============================================================================

/// Response body acknowledging a delete.
#[derive(Debug, Serialize)]
struct DeleteResponse {
    success: bool,
}

/// PUT /api/events/{id} - Shallow-merges updates onto an event.
///
/// Any authenticated role. Caller fields win on key collision; the
/// identifier is never reassigned. Unknown ids yield 404. Returns the merged
/// event.
async fn put_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Event>, ApiError> {
    authenticate(&state, &headers)?;

    let updates: Map<String, Value> = parse_body(&body)?;

    let mut events: Vec<Event> = load_collection(state.store.as_ref(), EVENTS_KEY).await?;
    let event = events
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    event.apply_updates(updates)?;
    let updated = event.clone();
    save_collection(state.store.as_ref(), EVENTS_KEY, &events).await?;

    info!(event_id = %id, "Event updated");
    Ok(Json(updated))
}

/// DELETE /api/events/{id} - Removes an event from the collection. Admin only.
///
/// Idempotent: deleting an unknown id persists the collection unchanged and
/// still acknowledges success.
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>, ApiError> {
    let role = authenticate(&state, &headers)?;
    require_admin(role)?;

    let mut events: Vec<Event> = load_collection(state.store.as_ref(), EVENTS_KEY).await?;
    events.retain(|e| e.id != id);
    save_collection(state.store.as_ref(), EVENTS_KEY, &events).await?;

    info!(event_id = %id, "Event deleted");
    Ok(Json(DeleteResponse { success: true }))
}

// ============================================================================
// /api/users - Users Collection
// ============================================================================

/// GET /api/users - Returns the full users collection.
async fn get_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, ApiError> {
    authenticate(&state, &headers)?;

    let users: Vec<User> = load_collection(state.store.as_ref(), USERS_KEY).await?;
    Ok(Json(users))
}

/// POST /api/users - Registers a user. Any authenticated role.
///
/// The identifier is prefixed by the creating caller's role. Email
/// uniqueness is enforced case-insensitively by a linear scan over the full
/// collection; a duplicate yields 409.
async fn post_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let role = authenticate(&state, &headers)?;

    let new_user: NewUser = parse_body(&body)?;

    let mut users: Vec<User> = load_collection(state.store.as_ref(), USERS_KEY).await?;
    if users.iter().any(|u| u.email_matches(&new_user.email)) {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = User::create(new_user, role);
    users.push(user.clone());
    save_collection(state.store.as_ref(), USERS_KEY, &users).await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

// ============================================================================
// Tests
// ============================================================================
