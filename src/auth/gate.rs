//! Authorization Gate
//!
//! Pure decisions over session state: may a view render, or where should
//! the caller be sent instead. Nothing here has side effects.

use serde::Serialize;

use crate::auth::models::{Role, SessionState};

/// Landing view for authenticated users.
pub const DEFAULT_ROUTE: &str = "/dashboard";
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToDefault,
}

impl Decision {
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(LOGIN_ROUTE),
            Decision::RedirectToDefault => Some(DEFAULT_ROUTE),
        }
    }
}

/// Decide whether `state` may access a view requiring one of `required`.
///
/// No roles (or an empty list) means any authenticated user.
pub fn can_access(state: &SessionState, required: Option<&[Role]>) -> Decision {
    if !state.is_authenticated {
        return Decision::RedirectToLogin;
    }
    if let Some(roles) = required.filter(|roles| !roles.is_empty()) {
        match state.role() {
            Some(role) if roles.contains(&role) => {}
            _ => return Decision::RedirectToDefault,
        }
    }
    Decision::Allow
}

/// Views of the application and the roles they require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRoute {
    Login,
    Signup,
    Dashboard,
    Topics,
    Timeline,
    ReportingEmployees,
    EmployeeTimeline,
    AllEmployees,
    VideoUpload,
}

const MANAGER_ONLY: &[Role] = &[Role::Manager];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

impl AppRoute {
    pub const ALL: [AppRoute; 9] = [
        AppRoute::Login,
        AppRoute::Signup,
        AppRoute::Dashboard,
        AppRoute::Topics,
        AppRoute::Timeline,
        AppRoute::ReportingEmployees,
        AppRoute::EmployeeTimeline,
        AppRoute::AllEmployees,
        AppRoute::VideoUpload,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            AppRoute::Login => LOGIN_ROUTE,
            AppRoute::Signup => "/signup",
            AppRoute::Dashboard => DEFAULT_ROUTE,
            AppRoute::Topics => "/topics",
            AppRoute::Timeline => "/timeline",
            AppRoute::ReportingEmployees => "/reporting-employees",
            AppRoute::EmployeeTimeline => "/employee/{employee_id}/timeline",
            AppRoute::AllEmployees => "/employees",
            AppRoute::VideoUpload => "/videos/upload",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, AppRoute::Login | AppRoute::Signup)
    }

    pub fn required_roles(&self) -> Option<&'static [Role]> {
        match self {
            AppRoute::ReportingEmployees | AppRoute::EmployeeTimeline => Some(MANAGER_ONLY),
            AppRoute::AllEmployees | AppRoute::VideoUpload => Some(ADMIN_ONLY),
            _ => None,
        }
    }

    /// Public views bounce authenticated users to the landing view;
    /// protected views go through [`can_access`].
    pub fn decide(&self, state: &SessionState) -> Decision {
        if self.is_public() {
            return if state.is_authenticated {
                Decision::RedirectToDefault
            } else {
                Decision::Allow
            };
        }
        can_access(state, self.required_roles())
    }
}

/// Match a concrete path against the route table.
pub fn resolve_path(path: &str) -> Option<AppRoute> {
    let trimmed = path.trim_end_matches('/');
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["employee", id, "timeline"] if !id.is_empty() => Some(AppRoute::EmployeeTimeline),
        _ => AppRoute::ALL
            .into_iter()
            .find(|route| route != &AppRoute::EmployeeTimeline && route.path() == trimmed),
    }
}

/// Decision for an arbitrary path. Unknown paths, including `/`, send
/// authenticated users to the landing view and everyone else to login.
pub fn decide_path(state: &SessionState, path: &str) -> Decision {
    match resolve_path(path) {
        Some(route) => route.decide(state),
        None if state.is_authenticated => Decision::RedirectToDefault,
        None => Decision::RedirectToLogin,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub name: &'static str,
    pub path: &'static str,
}

const fn item(name: &'static str, path: &'static str) -> MenuItem {
    MenuItem { name, path }
}

/// Sidebar entries for `role`. Managers get the team section, admins the
/// administration section; everyone else sees the base menu.
pub fn menu_for(role: Role) -> Vec<MenuItem> {
    let mut items = vec![
        item("Dashboard", DEFAULT_ROUTE),
        item("Topics", "/topics"),
        item("Timeline", "/timeline"),
    ];
    match role {
        Role::Admin => {
            items.push(item("All Employees", "/employees"));
            items.push(item("Settings", "/settings"));
        }
        Role::Manager => items.push(item("Reporting Employees", "/reporting-employees")),
        Role::User | Role::TeamLead => {}
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;

    fn session(role: Role) -> SessionState {
        SessionState::authenticated(User {
            id: "u1".to_string(),
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            role,
            avatar_url: None,
            department: None,
            manager_id: None,
        })
    }

    #[test]
    fn test_unauthenticated_always_goes_to_login() {
        let state = SessionState::default();
        assert_eq!(can_access(&state, None), Decision::RedirectToLogin);
        assert_eq!(can_access(&state, Some(&[Role::User])), Decision::RedirectToLogin);

        // a stale user record without the flag is still unauthenticated
        let mut stale = session(Role::Admin);
        stale.is_authenticated = false;
        assert_eq!(can_access(&stale, Some(&[Role::Admin])), Decision::RedirectToLogin);
    }

    #[test]
    fn test_role_membership() {
        let state = session(Role::User);
        assert_eq!(can_access(&state, None), Decision::Allow);
        assert_eq!(can_access(&state, Some(&[])), Decision::Allow);
        assert_eq!(can_access(&state, Some(&[Role::Manager])), Decision::RedirectToDefault);
        assert_eq!(
            can_access(&session(Role::Admin), Some(&[Role::Manager, Role::Admin])),
            Decision::Allow
        );
    }

    #[test]
    fn test_team_lead_is_not_special() {
        let state = session(Role::TeamLead);
        assert_eq!(can_access(&state, Some(&[Role::Manager])), Decision::RedirectToDefault);
        assert_eq!(menu_for(Role::TeamLead), menu_for(Role::User));
    }

    #[test]
    fn test_admin_cannot_open_manager_views() {
        let state = session(Role::Admin);
        assert_eq!(AppRoute::ReportingEmployees.decide(&state), Decision::RedirectToDefault);
        assert_eq!(AppRoute::VideoUpload.decide(&state), Decision::Allow);
    }

    #[test]
    fn test_public_routes_bounce_authenticated_users() {
        assert_eq!(AppRoute::Login.decide(&SessionState::default()), Decision::Allow);
        assert_eq!(AppRoute::Signup.decide(&session(Role::User)), Decision::RedirectToDefault);
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("/dashboard"), Some(AppRoute::Dashboard));
        assert_eq!(resolve_path("/topics/"), Some(AppRoute::Topics));
        assert_eq!(resolve_path("/employee/42/timeline"), Some(AppRoute::EmployeeTimeline));
        assert_eq!(resolve_path("/employee//timeline"), None);
        assert_eq!(resolve_path("/employee/{employee_id}/timeline"), Some(AppRoute::EmployeeTimeline));
        assert_eq!(resolve_path("/nowhere"), None);
    }

    #[test]
    fn test_decide_unknown_path() {
        assert_eq!(decide_path(&SessionState::default(), "/"), Decision::RedirectToLogin);
        assert_eq!(decide_path(&session(Role::User), "/"), Decision::RedirectToDefault);
        assert_eq!(
            decide_path(&session(Role::Manager), "/employee/3/timeline"),
            Decision::Allow
        );
    }

    #[test]
    fn test_menus() {
        let paths = |role| menu_for(role).into_iter().map(|i| i.path).collect::<Vec<_>>();
        assert_eq!(paths(Role::User), vec!["/dashboard", "/topics", "/timeline"]);
        assert!(paths(Role::Manager).contains(&"/reporting-employees"));
        assert!(!paths(Role::Manager).contains(&"/employees"));
        assert_eq!(paths(Role::Admin).len(), 5);
    }
}
