//! Learning routes: topics, dashboard, timeline and progress updates for
//! the signed-in user.
//!
//! Each request loads the user's data through a fresh `DataOrchestrator`,
//! the same three loads a client fires when an identity is established.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::middleware::{Rejection, Session, SessionExt};
use crate::error::CatalogError;
use crate::server::AppState;
use crate::services::catalog::filter_topics;
use crate::services::models::{NewTimelineEvent, TimelineEventType};
use crate::services::orchestrator::DataOrchestrator;
use crate::services::stats::in_progress_topics;

const HIGHLIGHTED_TOPICS: usize = 3;
const RECENT_EVENTS: usize = 5;

#[derive(Deserialize)]
pub struct TopicQuery {
    pub search: Option<String>,
}

/// Progress as sent by the client. Range checking happens in the handler
/// so out-of-range numbers get the same JSON error as the backend's.
#[derive(Deserialize)]
pub struct ProgressRequest {
    pub progress: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventRequest {
    pub topic_id: String,
    pub event_type: TimelineEventType,
    #[serde(default)]
    pub details: Option<String>,
}

pub async fn topics(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<TopicQuery>,
) -> Result<Json<Value>, Rejection> {
    session.require(None)?;
    let topics = state.backend.fetch_topics().await;
    let topics = filter_topics(&topics, query.search.as_deref().unwrap_or_default());
    Ok(Json(json!({ "topics": topics })))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, Rejection> {
    let user = session.require(None)?;
    let data = DataOrchestrator::new(state.backend.clone()).load_for(&user.id).await;

    let recent: Vec<_> = data.timeline.iter().take(RECENT_EVENTS).collect();
    Ok(Json(json!({
        "stats": data.dashboard_stats,
        "inProgress": in_progress_topics(&data.topics, &data.learnings, HIGHLIGHTED_TOPICS),
        "recentTimeline": recent,
    })))
}

pub async fn timeline(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, Rejection> {
    let user = session.require(None)?;
    let data = DataOrchestrator::new(state.backend.clone()).load_for(&user.id).await;
    Ok(Json(json!({ "timeline": data.timeline, "topics": data.topics })))
}

pub async fn add_timeline_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<TimelineEventRequest>,
) -> Result<(StatusCode, Json<Value>), Rejection> {
    let user = session.require(None)?;
    let orchestrator = DataOrchestrator::new(state.backend.clone());
    let event = orchestrator
        .add_timeline_event(NewTimelineEvent {
            user_id: user.id,
            topic_id: payload.topic_id,
            event_type: payload.event_type,
            details: payload.details,
        })
        .await;
    Ok((StatusCode::CREATED, Json(json!({ "event": event }))))
}

pub async fn update_progress(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(learning_id): Path<String>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<Value>, Rejection> {
    let user = session.require(None)?;
    let orchestrator = DataOrchestrator::new(state.backend.clone());
    orchestrator.load_for(&user.id).await;

    let result = match u8::try_from(payload.progress) {
        Ok(progress) => orchestrator.update_learning_progress(&learning_id, progress).await,
        Err(_) => Err(CatalogError::InvalidProgress(payload.progress)),
    };
    match result {
        Ok(learning) => Ok(Json(json!({
            "learning": learning,
            "stats": orchestrator.snapshot().dashboard_stats,
        }))),
        Err(e) => {
            tracing::info!("progress update for {} rejected: {}", learning_id, e);
            let status = match &e {
                CatalogError::LearningNotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::InvalidProgress(_) => StatusCode::BAD_REQUEST,
            };
            Err((status, Json(json!({ "error": e.to_string() }))))
        }
    }
}

pub fn create_learning_routes() -> Router<AppState> {
    Router::new()
        .route("/api/topics", get(topics))
        .route("/api/dashboard", get(dashboard))
        .route("/api/timeline", get(timeline).post(add_timeline_event))
        .route("/api/learnings/{id}/progress", put(update_progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{Browser, test_state};

    async fn signed_in(email: &str) -> Browser {
        let (state, _) = test_state();
        let mut browser = Browser::new(state);
        let (status, _) = browser
            .post("/api/auth/login", json!({ "email": email, "password": "x", "rememberMe": true }))
            .await;
        assert_eq!(status, StatusCode::OK);
        browser
    }

    #[tokio::test]
    async fn test_learning_routes_require_session() {
        let (state, _) = test_state();
        let mut browser = Browser::new(state);
        for uri in ["/api/topics", "/api/dashboard", "/api/timeline"] {
            let (status, body) = browser.get(uri).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["redirect"], "/login");
        }
    }

    #[tokio::test]
    async fn test_topic_search() {
        let mut browser = signed_in("user@example.com").await;
        let (_, body) = browser.get("/api/topics").await;
        assert_eq!(body["topics"].as_array().unwrap().len(), 6);

        let (_, body) = browser.get("/api/topics?search=Tokio").await;
        let topics = body["topics"].as_array().unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0]["id"], "t2");
    }

    #[tokio::test]
    async fn test_dashboard_for_seed_user() {
        let mut browser = signed_in("user@example.com").await;
        let (status, body) = browser.get("/api/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["totalTopics"], 4);
        assert_eq!(body["stats"]["averageProgress"], 45);

        let highlighted: Vec<_> = body["inProgress"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(highlighted, vec!["t2", "t3"]);
        assert_eq!(body["recentTimeline"][0]["id"], "milestone-l2");
    }

    #[tokio::test]
    async fn test_user_without_learnings_gets_empty_stats() {
        let mut browser = signed_in("admin@example.com").await;
        let (_, body) = browser.get("/api/dashboard").await;
        assert_eq!(body["stats"]["totalTopics"], 0);
        assert!(body["inProgress"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_update() {
        let mut browser = signed_in("user@example.com").await;

        let (status, body) = browser.put("/api/learnings/l3/progress", json!({ "progress": 100 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["learning"]["status"], "completed");
        assert_eq!(body["stats"]["completedTopics"], 2);

        let (status, _) = browser.put("/api/learnings/l3/progress", json!({ "progress": 101 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // another user's learning
        let (status, _) = browser.put("/api/learnings/l5/progress", json!({ "progress": 10 })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_progress_outside_byte_range_is_json_error() {
        let mut browser = signed_in("user@example.com").await;
        for progress in [300, -5] {
            let (status, body) = browser.put("/api/learnings/l3/progress", json!({ "progress": progress })).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{progress}");
            assert_eq!(
                body["error"],
                format!("progress must be between 0 and 100, got {progress}")
            );
        }
    }

    #[tokio::test]
    async fn test_added_event_shows_in_timeline() {
        let mut browser = signed_in("user@example.com").await;
        let (status, body) = browser
            .post("/api/timeline", json!({ "topicId": "t5", "eventType": "started", "details": "Kicked off" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["event"]["userId"], "3");
        let added = body["event"]["id"].clone();

        let (_, body) = browser.get("/api/timeline").await;
        let timeline = body["timeline"].as_array().unwrap();
        assert!(timeline.iter().any(|e| e["id"] == added && e["details"] == "Kicked off"));
    }
}
