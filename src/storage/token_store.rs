//! Token Store
//!
//! Persists the access token, refresh token, remember-me flag and the
//! cached current user under the key names the browser client uses.
//! Expiry is not enforced here.

use std::sync::Arc;

use crate::auth::models::User;
use crate::storage::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const REMEMBER_ME_KEY: &str = "rememberMe";
pub const CURRENT_USER_KEY: &str = "user";

/// Keys that carry session continuity, as opposed to the display cache.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, REMEMBER_ME_KEY];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store the access token, and the refresh token when given. `None`
    /// removes any previously persisted refresh token.
    pub fn put(&self, access_token: &str, refresh_token: Option<&str>) {
        self.store.set(ACCESS_TOKEN_KEY, access_token);
        match refresh_token {
            Some(token) => self.store.set(REFRESH_TOKEN_KEY, token),
            None => self.store.remove(REFRESH_TOKEN_KEY),
        }
    }

    /// Replace only the access token.
    pub fn put_access_token(&self, access_token: &str) {
        self.store.set(ACCESS_TOKEN_KEY, access_token);
    }

    pub fn get(&self) -> StoredTokens {
        StoredTokens {
            access_token: non_empty(self.store.get(ACCESS_TOKEN_KEY)),
            refresh_token: non_empty(self.store.get(REFRESH_TOKEN_KEY)),
        }
    }

    pub fn clear(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
    }

    pub fn remember_me(&self) -> bool {
        self.store.get(REMEMBER_ME_KEY).as_deref() == Some("true")
    }

    pub fn set_remember_me(&self, remember: bool) {
        if remember {
            self.store.set(REMEMBER_ME_KEY, "true");
        } else {
            self.store.remove(REMEMBER_ME_KEY);
        }
    }

    /// The cached current user. Display only; never consulted for auth.
    pub fn cached_user(&self) -> Option<User> {
        let raw = self.store.get(CURRENT_USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("[TokenStore] ignoring unreadable cached user: {}", e);
                None
            }
        }
    }

    pub fn set_cached_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(json) => self.store.set(CURRENT_USER_KEY, &json),
            Err(e) => tracing::error!("[TokenStore] failed to serialize cached user: {}", e),
        }
    }

    pub fn clear_cached_user(&self) {
        self.store.remove(CURRENT_USER_KEY);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, TokenStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), TokenStore::new(kv))
    }

    #[test]
    fn test_put_without_refresh_drops_old_refresh() {
        let (kv, tokens) = store();
        tokens.put("a1", Some("r1"));
        tokens.put("a2", None);

        assert_eq!(
            tokens.get(),
            StoredTokens {
                access_token: Some("a2".to_string()),
                refresh_token: None,
            }
        );
        assert_eq!(kv.get(ACCESS_TOKEN_KEY).as_deref(), Some("a2"));
    }

    #[test]
    fn test_remember_me_is_string_true() {
        let (kv, tokens) = store();
        assert!(!tokens.remember_me());
        kv.set(REMEMBER_ME_KEY, "yes");
        assert!(!tokens.remember_me());
        tokens.set_remember_me(true);
        assert_eq!(kv.get(REMEMBER_ME_KEY).as_deref(), Some("true"));
        tokens.set_remember_me(false);
        assert_eq!(kv.get(REMEMBER_ME_KEY), None);
    }

    #[test]
    fn test_cached_user() {
        let (kv, tokens) = store();
        let user = User {
            id: "u1".to_string(),
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            role: Role::User,
            avatar_url: None,
            department: None,
            manager_id: None,
        };
        tokens.set_cached_user(&user);
        assert_eq!(tokens.cached_user(), Some(user));

        kv.set(CURRENT_USER_KEY, "{broken");
        assert_eq!(tokens.cached_user(), None);
    }
}
