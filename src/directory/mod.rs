//! # Session Directory
//!
//! The authoritative list of known identities: the seed list, or the
//! persisted `users` list once any signup has written it. The first write
//! copies the seed list into the persisted list, so afterwards the
//! persisted list is the whole directory.
//!
//! Email matching is exact and case-sensitive everywhere.

pub mod seed;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::auth::models::User;
use crate::storage::KeyValueStore;

pub use seed::SEED_USERS;

pub const USERS_KEY: &str = "users";

/// Read side of the directory.
pub trait UserDirectory: Send + Sync {
    fn list_all(&self) -> Vec<User>;

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.list_all().into_iter().find(|u| u.email == email)
    }

    fn find_by_id(&self, id: &str) -> Option<User> {
        self.list_all().into_iter().find(|u| u.id == id)
    }
}

/// Avatar for a user without an uploaded picture.
pub fn avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        urlencoding::encode(name)
    )
}

pub struct SessionDirectory {
    store: Arc<dyn KeyValueStore>,
    seed: Vec<User>,
    // serializes read-modify-write of the persisted list within this process
    write_lock: Mutex<()>,
}

impl SessionDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_seed(store, SEED_USERS.clone())
    }

    pub fn with_seed(store: Arc<dyn KeyValueStore>, seed: Vec<User>) -> Self {
        Self {
            store,
            seed,
            write_lock: Mutex::new(()),
        }
    }

    /// The persisted list, if one has been written and is readable.
    fn persisted(&self) -> Option<Vec<User>> {
        let raw = self.store.get(USERS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(users) => Some(users),
            Err(e) => {
                tracing::warn!("[SessionDirectory] persisted user list unreadable, using seed: {}", e);
                None
            }
        }
    }

    fn write(&self, users: &[User]) {
        match serde_json::to_string(users) {
            Ok(json) => self.store.set(USERS_KEY, &json),
            Err(e) => tracing::error!("[SessionDirectory] failed to serialize users: {}", e),
        }
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.list_all().iter().any(|u| u.email == email)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.list_all().iter().any(|u| u.id == id)
    }

    /// Append a user and persist the whole list. Uniqueness is the caller's
    /// concern.
    pub fn append(&self, user: User) {
        let _guard = self.write_lock.lock();
        let mut users = self.list_all();
        tracing::debug!("[SessionDirectory] appending {} ({} known)", user.id, users.len());
        users.push(user);
        self.write(&users);
    }

    /// Append `user` unless its email is already known. Returns false, and
    /// leaves the directory untouched, on a duplicate.
    pub fn try_append(&self, user: User) -> bool {
        let _guard = self.write_lock.lock();
        let mut users = self.list_all();
        if users.iter().any(|u| u.email == user.email) {
            return false;
        }
        users.push(user);
        self.write(&users);
        true
    }

    /// Whether `id` belongs to a seed user. Seed records are fixed even
    /// after they have been copied into the persisted list.
    pub fn is_seed(&self, id: &str) -> bool {
        self.seed.iter().any(|u| u.id == id)
    }

    /// Replace the persisted record with `user.id`. Returns false, writing
    /// nothing, for seed users and for ids that were never persisted.
    pub fn update(&self, user: &User) -> bool {
        if self.is_seed(&user.id) {
            return false;
        }
        let _guard = self.write_lock.lock();
        let Some(mut users) = self.persisted() else {
            return false;
        };
        let Some(slot) = users.iter_mut().find(|u| u.id == user.id) else {
            return false;
        };
        *slot = user.clone();
        self.write(&users);
        true
    }
}

impl UserDirectory for SessionDirectory {
    fn list_all(&self) -> Vec<User> {
        self.persisted().unwrap_or_else(|| self.seed.clone())
    }
}
