//! Seed identities present before anyone signs up.

use once_cell::sync::Lazy;

use crate::auth::models::{Role, User};

fn seed_user(
    id: &str,
    name: &str,
    email: &str,
    role: Role,
    department: &str,
    manager_id: Option<&str>,
) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        avatar_url: Some(super::avatar_url(name)),
        department: Some(department.to_string()),
        manager_id: manager_id.map(str::to_string),
    }
}

pub static SEED_USERS: Lazy<Vec<User>> = Lazy::new(|| {
    vec![
        seed_user("1", "Priya Sharma", "admin@example.com", Role::Admin, "Administration", None),
        seed_user("2", "Rahul Verma", "manager@example.com", Role::Manager, "Engineering", Some("1")),
        seed_user("3", "Ananya Iyer", "user@example.com", Role::User, "Engineering", Some("2")),
        seed_user("4", "Vikram Nair", "vikram@example.com", Role::User, "Engineering", Some("2")),
        seed_user("5", "Meera Pillai", "meera@example.com", Role::User, "Design", Some("2")),
        seed_user("6", "Arjun Menon", "arjun@example.com", Role::TeamLead, "Engineering", Some("2")),
        // reports to an account that no longer exists
        seed_user("7", "Kavya Rao", "kavya@example.com", Role::User, "Marketing", Some("99")),
    ]
});
