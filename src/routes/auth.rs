//! Auth routes: login, signup, logout, role changes and the session-derived
//! navigation data.

use axum::{
    Extension, Json, Router,
    extract::Query,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::gate::{decide_path, menu_for, resolve_path};
use crate::auth::middleware::{Rejection, Session, SessionExt};
use crate::auth::models::Role;
use crate::server::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Roles a user may switch to. Team leads are assigned, never chosen.
const SWITCHABLE_ROLES: [Role; 3] = [Role::User, Role::Manager, Role::Admin];

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Deserialize)]
pub struct AccessQuery {
    pub path: String,
}

pub async fn login(Extension(session): Extension<Session>, Json(payload): Json<LoginRequest>) -> (StatusCode, Json<Value>) {
    if !session.login(&payload.email, &payload.password, payload.remember_me) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid email or password" })));
    }
    (StatusCode::OK, Json(json!({ "user": session.current_user() })))
}

pub async fn signup(Extension(session): Extension<Session>, Json(payload): Json<SignupRequest>) -> (StatusCode, Json<Value>) {
    if !session.signup(&payload.name, &payload.email, &payload.password) {
        return (StatusCode::CONFLICT, Json(json!({ "error": "Email already registered" })));
    }
    (StatusCode::CREATED, Json(json!({ "user": session.current_user() })))
}

pub async fn logout(Extension(session): Extension<Session>) -> StatusCode {
    session.logout();
    StatusCode::NO_CONTENT
}

/// The restored session, authenticated or not.
pub async fn me(Extension(session): Extension<Session>) -> Json<Value> {
    Json(json!(session.session_state()))
}

pub async fn update_role(
    Extension(session): Extension<Session>,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<Value>, Rejection> {
    session.require(None)?;
    if !SWITCHABLE_ROLES.contains(&payload.role) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("role {} cannot be selected", payload.role) })),
        ));
    }
    session.update_role(payload.role);
    Ok(Json(json!({ "user": session.current_user() })))
}

pub async fn navigation(Extension(session): Extension<Session>) -> Result<Json<Value>, Rejection> {
    let user = session.require(None)?;
    Ok(Json(json!({
        "role": user.role,
        "items": menu_for(user.role),
    })))
}

/// Gate decision for a client-side route, e.g. `/api/access?path=/employees`.
pub async fn access(Extension(session): Extension<Session>, Query(query): Query<AccessQuery>) -> Json<Value> {
    let decision = decide_path(&session.session_state(), &query.path);
    Json(json!({
        "path": query.path,
        "route": resolve_path(&query.path),
        "decision": decision,
        "redirect": decision.redirect_target(),
    }))
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/role", put(update_role))
        .route("/api/navigation", get(navigation))
        .route("/api/access", get(access))
}
