//! Auth Session Manager
//!
//! Owns the in-memory session (current user, authenticated flag), derives
//! it from persisted tokens on startup, and runs login, signup, logout and
//! role changes. State is published through a `watch` channel, so
//! dependents only ever see a fully restored state.
//!
//! No operation here fails across the public boundary: decode and lookup
//! failures during restore end in an unauthenticated session, and
//! login/signup report failure as `false`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::auth::gate::{self, Decision};
use crate::auth::jwt::TokenCodec;
use crate::auth::models::{IdentityClaims, Role, SessionPhase, SessionState, User};
use crate::directory::{SessionDirectory, UserDirectory, avatar_url};
use crate::error::AuthError;
use crate::storage::TokenStore;
use crate::storage::token_store::StoredTokens;

/// Department given to self-registered users.
pub const DEFAULT_DEPARTMENT: &str = "General";

pub struct AuthSessionManager {
    codec: Arc<TokenCodec>,
    tokens: TokenStore,
    directory: Arc<SessionDirectory>,
    phase: Mutex<SessionPhase>,
    state: watch::Sender<SessionState>,
}

impl AuthSessionManager {
    /// Create a manager with an empty, unauthenticated session. Call
    /// [`restore`](Self::restore) to pick up a persisted session.
    pub fn new(codec: Arc<TokenCodec>, tokens: TokenStore, directory: Arc<SessionDirectory>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            codec,
            tokens,
            directory,
            phase: Mutex::new(SessionPhase::Unauthenticated),
            state,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock()
    }

    /// Receive every published session state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn directory(&self) -> &Arc<SessionDirectory> {
        &self.directory
    }

    /// Rebuild the session from persisted tokens.
    ///
    /// A valid access token resolves by email. Otherwise a valid refresh
    /// token resolves by id and a fresh access token is persisted. Anything
    /// else clears the persisted tokens.
    pub fn restore(&self) -> SessionPhase {
        *self.phase.lock() = SessionPhase::Restoring;

        let stored = self.tokens.get();
        let remember_me = self.tokens.remember_me();

        if stored.access_token.is_none() && (stored.refresh_token.is_none() || !remember_me) {
            tracing::debug!("[SessionManager] nothing to restore");
            self.clear_session();
            return SessionPhase::Unauthenticated;
        }

        match self.resolve_stored(&stored) {
            Ok(user) => {
                tracing::info!("[SessionManager] restored session for {}", user.id);
                self.establish(user);
                SessionPhase::Authenticated
            }
            Err(e) => {
                match &e {
                    AuthError::Expired(_) => tracing::debug!("[SessionManager] restore ended: {}", e),
                    _ => tracing::warn!("[SessionManager] restore failed: {}", e),
                }
                self.clear_session();
                SessionPhase::Unauthenticated
            }
        }
    }

    fn resolve_stored(&self, stored: &StoredTokens) -> Result<User, AuthError> {
        if let Some(access) = stored.access_token.as_deref().filter(|t| self.codec.is_valid(t)) {
            let claims = self.codec.decode_access(access)?;
            return self
                .directory
                .find_by_email(&claims.email)
                .ok_or(AuthError::LookupMiss(claims.email));
        }

        let Some(refresh) = stored.refresh_token.as_deref() else {
            if let Some(access) = stored.access_token.as_deref() {
                self.codec.decode_access(access)?;
            }
            return Err(AuthError::Expired("access token expired and no refresh token".to_string()));
        };
        let claims = self.codec.decode_refresh(refresh)?;
        if !self.codec.is_valid(refresh) {
            return Err(AuthError::Expired(format!("refresh token for {} expired", claims.user_id)));
        }
        let user = self
            .directory
            .find_by_id(&claims.user_id)
            .ok_or(AuthError::LookupMiss(claims.user_id))?;

        let access = self.codec.issue_access_token(&IdentityClaims::from(&user))?;
        self.tokens.put_access_token(&access);
        tracing::debug!("[SessionManager] access token refreshed for {}", user.id);
        Ok(user)
    }

    /// Log in by exact email match. Any password is accepted: there are no
    /// stored credentials to check it against.
    pub fn login(&self, email: &str, _password: &str, remember_me: bool) -> bool {
        let Some(user) = self.directory.find_by_email(email) else {
            tracing::info!("[SessionManager] login rejected: {}", AuthError::InvalidCredentials);
            return false;
        };

        match self.issue_pair(&user) {
            Ok((access, refresh)) => {
                self.persist_tokens(&access, &refresh, remember_me);
                tracing::info!("[SessionManager] {} logged in (remember_me={})", user.id, remember_me);
                self.establish(user);
                true
            }
            Err(e) => {
                tracing::error!("[SessionManager] login token issue failed: {}", e);
                false
            }
        }
    }

    /// Register a new `user`-role account and log it in, remembered.
    pub fn signup(&self, name: &str, email: &str, _password: &str) -> bool {
        if self.directory.contains_email(email) {
            tracing::info!("[SessionManager] signup rejected: {}", AuthError::DuplicateEmail(email.to_string()));
            return false;
        }

        let user = User {
            id: self.next_user_id(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::User,
            avatar_url: Some(avatar_url(name)),
            department: Some(DEFAULT_DEPARTMENT.to_string()),
            manager_id: None,
        };

        let (access, refresh) = match self.issue_pair(&user) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("[SessionManager] signup token issue failed: {}", e);
                return false;
            }
        };

        // the email check above can race another writer; this one cannot
        if !self.directory.try_append(user.clone()) {
            tracing::info!("[SessionManager] signup rejected: {}", AuthError::DuplicateEmail(user.email));
            return false;
        }

        self.persist_tokens(&access, &refresh, true);
        tracing::info!("[SessionManager] {} signed up", user.id);
        self.establish(user);
        true
    }

    /// Drop the session and everything persisted for it. Idempotent.
    pub fn logout(&self) {
        tracing::info!("[SessionManager] logout");
        self.clear_session();
    }

    /// Change the current user's role and reissue tokens bound to it.
    /// Ignored when unauthenticated.
    pub fn update_role(&self, role: Role) {
        let current = self.session_state();
        let Some(mut user) = current.user.filter(|_| current.is_authenticated) else {
            tracing::debug!("[SessionManager] role change ignored while unauthenticated");
            return;
        };

        user.role = role;
        let remembered = self.tokens.get().refresh_token.is_some();
        match self.issue_pair(&user) {
            Ok((access, refresh)) => {
                self.tokens.put(&access, remembered.then_some(refresh.as_str()));
            }
            Err(e) => {
                tracing::error!("[SessionManager] role change token issue failed: {}", e);
                return;
            }
        }

        if !self.directory.update(&user) {
            tracing::debug!("[SessionManager] {} is a seed user; role change kept in session only", user.id);
        }
        tracing::info!("[SessionManager] {} role set to {}", user.id, role);
        self.establish(user);
    }

    pub fn can_access(&self, required_roles: Option<&[Role]>) -> Decision {
        gate::can_access(&self.session_state(), required_roles)
    }

    fn issue_pair(&self, user: &User) -> Result<(String, String), AuthError> {
        let access = self.codec.issue_access_token(&IdentityClaims::from(user))?;
        let refresh = self.codec.issue_refresh_token(&user.id)?;
        Ok((access, refresh))
    }

    fn persist_tokens(&self, access: &str, refresh: &str, remember_me: bool) {
        if remember_me {
            self.tokens.put(access, Some(refresh));
        } else {
            self.tokens.put(access, None);
        }
        self.tokens.set_remember_me(remember_me);
    }

    fn next_user_id(&self) -> String {
        let mut millis = self.codec.clock().now().timestamp_millis();
        loop {
            let id = format!("user{millis}");
            if !self.directory.contains_id(&id) {
                return id;
            }
            millis += 1;
        }
    }

    fn establish(&self, user: User) {
        self.tokens.set_cached_user(&user);
        *self.phase.lock() = SessionPhase::Authenticated;
        self.state.send_replace(SessionState::authenticated(user));
    }

    fn clear_session(&self) {
        self.tokens.clear();
        self.tokens.set_remember_me(false);
        self.tokens.clear_cached_user();
        *self.phase.lock() = SessionPhase::Unauthenticated;
        self.state.send_replace(SessionState::default());
    }
}
