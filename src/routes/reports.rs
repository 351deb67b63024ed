//! Report routes for managers (their direct reports) and admins (the whole
//! directory).

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::gate::AppRoute;
use crate::auth::middleware::{Rejection, Session, SessionExt};
use crate::auth::models::User;
use crate::directory::UserDirectory;
use crate::server::AppState;
use crate::services::orchestrator::DataOrchestrator;
use crate::services::reports::{departments, direct_reports, employee_for_manager, filter_employees, manager_name};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRow {
    #[serde(flatten)]
    pub user: User,
    pub manager_name: String,
}

#[derive(Deserialize)]
pub struct EmployeeQuery {
    pub search: Option<String>,
    pub department: Option<String>,
}

fn with_manager_names(directory: &dyn UserDirectory, users: Vec<User>) -> Vec<EmployeeRow> {
    users
        .into_iter()
        .map(|user| EmployeeRow {
            manager_name: manager_name(directory, &user),
            user,
        })
        .collect()
}

pub async fn my_direct_reports(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, Rejection> {
    let manager = session.require(AppRoute::ReportingEmployees.required_roles())?;
    let reports = direct_reports(state.directory.as_ref(), &manager);
    Ok(Json(json!({ "employees": reports })))
}

pub async fn employee_timeline(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(employee_id): Path<String>,
) -> Result<Json<Value>, Rejection> {
    let viewer = session.require(AppRoute::EmployeeTimeline.required_roles())?;
    let Some(employee) = employee_for_manager(state.directory.as_ref(), &viewer, &employee_id) else {
        return Err((StatusCode::NOT_FOUND, Json(json!({ "error": "Employee not found" }))));
    };

    let data = DataOrchestrator::new(state.backend.clone()).load_for(&employee.id).await;
    Ok(Json(json!({
        "employee": employee,
        "stats": data.dashboard_stats,
        "learnings": data.learnings,
        "timeline": data.timeline,
    })))
}

pub async fn all_employees(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<EmployeeQuery>,
) -> Result<Json<Value>, Rejection> {
    session.require(AppRoute::AllEmployees.required_roles())?;
    let directory = state.directory.as_ref();
    let users = directory.list_all();
    let matching = filter_employees(&users, query.search.as_deref(), query.department.as_deref());

    Ok(Json(json!({
        "employees": with_manager_names(directory, matching),
        "departments": departments(&users),
    })))
}

pub fn create_report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/direct-reports", get(my_direct_reports))
        .route("/api/reports/employees/{id}/timeline", get(employee_timeline))
        .route("/api/admin/employees", get(all_employees))
}
