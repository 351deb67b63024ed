use axum::response::Json;
use serde_json::json;

/// Health check endpoint handler.
///
/// Lives outside the session middleware, so it never touches cookies or
/// the user directory.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
///
/// # Response Format
/// ```json
/// {
///   "status": "pong"
/// }
/// ```
///
/// # Examples
/// ```bash
/// curl http://localhost:3000/ping
/// # Response: {"status":"pong"}
/// ```
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}
