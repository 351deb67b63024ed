//! Manager and admin views over the user directory.

use crate::auth::models::{Role, User};
use crate::directory::UserDirectory;

pub const UNKNOWN_MANAGER: &str = "Unknown";

/// Users whose `managerId` is `manager`.
pub fn direct_reports(directory: &dyn UserDirectory, manager: &User) -> Vec<User> {
    directory
        .list_all()
        .into_iter()
        .filter(|u| u.manager_id.as_deref() == Some(manager.id.as_str()))
        .collect()
}

/// `employee_id`, provided `viewer` is a manager and the employee reports
/// to them. Anything else looks the same as an unknown employee.
pub fn employee_for_manager(directory: &dyn UserDirectory, viewer: &User, employee_id: &str) -> Option<User> {
    if viewer.role != Role::Manager {
        return None;
    }
    directory
        .find_by_id(employee_id)
        .filter(|employee| employee.manager_id.as_deref() == Some(viewer.id.as_str()))
}

pub fn manager_name(directory: &dyn UserDirectory, user: &User) -> String {
    user.manager_id
        .as_deref()
        .and_then(|id| directory.find_by_id(id))
        .map(|manager| manager.name)
        .unwrap_or_else(|| UNKNOWN_MANAGER.to_string())
}

/// Case-insensitive search on name or email, plus an exact department
/// match. Blank filters match everyone.
pub fn filter_employees(users: &[User], search: Option<&str>, department: Option<&str>) -> Vec<User> {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let department = department.filter(|d| !d.is_empty());

    users
        .iter()
        .filter(|u| match &needle {
            Some(needle) => u.name.to_lowercase().contains(needle) || u.email.to_lowercase().contains(needle),
            None => true,
        })
        .filter(|u| match department {
            Some(department) => u.department.as_deref() == Some(department),
            None => true,
        })
        .cloned()
        .collect()
}

/// Distinct departments in first-seen order.
pub fn departments(users: &[User]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for department in users.iter().filter_map(|u| u.department.as_deref()) {
        if !seen.iter().any(|d| d == department) {
            seen.push(department.to_string());
        }
    }
    seen
}
