//! End-to-end session scenarios against the public library API.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration};
use learning_tracker::auth::gate::{AppRoute, decide_path};
use learning_tracker::clock::ManualClock;
use learning_tracker::services::catalog::MockLearningBackend;
use learning_tracker::services::orchestrator::{DataOrchestrator, IdentityWatcher};
use learning_tracker::{
    AuthSessionManager, Decision, KeyValueStore, MemoryStore, Role, SessionDirectory, SessionState, TokenCodec,
    TokenScheme, TokenStore, User, UserDirectory,
};

/// One browser profile: its durable storage, plus the process-wide codec
/// and directory.
struct Profile {
    clock: Arc<ManualClock>,
    codec: Arc<TokenCodec>,
    storage: Arc<MemoryStore>,
    directory: Arc<SessionDirectory>,
}

impl Profile {
    fn new(seed: Vec<User>) -> Self {
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(1_710_000_000, 0).unwrap()));
        let codec = Arc::new(TokenCodec::new(TokenScheme::Signed, "integration", clock.clone()));
        let storage = Arc::new(MemoryStore::new());
        let directory = Arc::new(SessionDirectory::with_seed(storage.clone(), seed));
        Self {
            clock,
            codec,
            storage,
            directory,
        }
    }

    /// A manager as a freshly loaded page would build it.
    fn load(&self) -> AuthSessionManager {
        let manager = AuthSessionManager::new(
            self.codec.clone(),
            TokenStore::new(self.storage.clone()),
            self.directory.clone(),
        );
        manager.restore();
        manager
    }
}

fn seed_user() -> Vec<User> {
    vec![User {
        id: "u1".to_string(),
        name: "Ada".to_string(),
        email: "a@x.com".to_string(),
        role: Role::User,
        avatar_url: None,
        department: None,
        manager_id: None,
    }]
}

#[test]
fn test_login_role_change_logout_scenario() {
    let profile = Profile::new(seed_user());
    let session = profile.load();

    assert!(session.login("a@x.com", "anything", false));
    let state = session.session_state();
    assert!(state.is_authenticated);
    assert_eq!(state.user_id(), Some("u1"));

    assert_eq!(session.can_access(Some(&[Role::Manager])), Decision::RedirectToDefault);

    session.update_role(Role::Manager);
    assert_eq!(session.session_state().role(), Some(Role::Manager));
    assert_eq!(session.can_access(Some(&[Role::Manager])), Decision::Allow);

    session.logout();
    assert_eq!(session.session_state(), SessionState::default());
}

#[test]
fn test_update_role_to_admin() {
    let profile = Profile::new(seed_user());
    let session = profile.load();
    session.login("a@x.com", "pw", true);

    session.update_role(Role::Admin);
    assert_eq!(session.can_access(Some(&[Role::Manager])), Decision::RedirectToDefault);
    assert_eq!(session.can_access(Some(&[Role::Admin])), Decision::Allow);
    assert_eq!(
        decide_path(&session.session_state(), AppRoute::AllEmployees.path()),
        Decision::Allow
    );
}

#[test]
fn test_unauthenticated_is_always_sent_to_login() {
    let profile = Profile::new(seed_user());
    let session = profile.load();
    for roles in [None, Some(&[][..]), Some(&[Role::User][..]), Some(&[Role::Admin][..])] {
        assert_eq!(session.can_access(roles), Decision::RedirectToLogin);
    }
}

#[test]
fn test_signup_then_login_with_any_password() {
    let profile = Profile::new(seed_user());
    let session = profile.load();

    assert!(session.signup("Grace", "g@x.com", "first"));
    session.logout();

    assert!(session.login("g@x.com", "a different password", false));
    let user = session.session_state().user.unwrap();
    assert_eq!(user.email, "g@x.com");
    assert_eq!(user.role, Role::User);
}

#[test]
fn test_duplicate_signup_leaves_directory_unchanged() {
    let profile = Profile::new(seed_user());
    let session = profile.load();
    let before = profile.directory.list_all();

    assert!(!session.signup("Imposter", "a@x.com", "pw"));
    assert_eq!(profile.directory.list_all(), before);
    assert!(!session.session_state().is_authenticated);
}

#[test]
fn test_logout_then_reload_is_unauthenticated() {
    let profile = Profile::new(seed_user());
    let session = profile.load();
    session.login("a@x.com", "pw", true);
    session.logout();

    let reloaded = profile.load();
    assert!(!reloaded.session_state().is_authenticated);
}

#[test]
fn test_reload_without_remember_me_after_expiry() {
    let profile = Profile::new(seed_user());
    profile.load().login("a@x.com", "pw", false);

    // still within the access token lifetime
    assert!(profile.load().session_state().is_authenticated);

    profile.clock.advance(Duration::minutes(15));
    assert!(!profile.load().session_state().is_authenticated);
    assert_eq!(profile.storage.get("auth_token"), None);
}

#[test]
fn test_reload_with_remember_me_uses_refresh_token() {
    let profile = Profile::new(seed_user());
    profile.load().login("a@x.com", "pw", true);
    let original = profile.storage.get("auth_token").unwrap();

    profile.clock.advance(Duration::hours(2));
    let reloaded = profile.load();
    assert!(reloaded.session_state().is_authenticated);

    let refreshed = profile.storage.get("auth_token").unwrap();
    assert_ne!(refreshed, original);
    assert!(profile.codec.is_valid(&refreshed));

    // past the refresh lifetime nothing survives
    profile.clock.advance(Duration::days(8));
    assert!(!profile.load().session_state().is_authenticated);
}

#[test]
fn test_issued_token_valid_until_exp() {
    let profile = Profile::new(seed_user());
    profile.load().login("a@x.com", "pw", false);
    let token = profile.storage.get("auth_token").unwrap();
    let claims = profile.codec.decode_access(&token).unwrap();

    assert!(profile.codec.is_valid(&token));
    profile.clock.set(DateTime::from_timestamp(claims.exp - 1, 0).unwrap());
    assert!(profile.codec.is_valid(&token));
    profile.clock.set(DateTime::from_timestamp(claims.exp, 0).unwrap());
    assert!(!profile.codec.is_valid(&token));
}

#[tokio::test]
async fn test_orchestrator_follows_the_session() {
    let profile = Profile::new(learning_tracker::directory::SEED_USERS.clone());
    let backend = MockLearningBackend::new(profile.clock.clone()).with_delays(StdDuration::ZERO, StdDuration::ZERO);
    let orchestrator = Arc::new(DataOrchestrator::new(Arc::new(backend)));

    let session = profile.load();
    let mut rx = session.subscribe();
    let mut watcher = IdentityWatcher::new(orchestrator.clone());

    // nothing restored, nothing loaded
    assert!(!watcher.observe(&rx.borrow_and_update()));

    assert!(session.login("user@example.com", "pw", false));
    assert!(rx.has_changed().unwrap());
    assert!(watcher.observe(&rx.borrow_and_update()));
    watcher.take_scope().unwrap().finish().await;

    let loaded = orchestrator.snapshot();
    assert_eq!(loaded.learnings.len(), 4);
    assert_eq!(loaded.dashboard_stats.average_progress, 45);

    session.logout();
    assert!(!watcher.observe(&rx.borrow_and_update()));
    assert!(orchestrator.snapshot().learnings.is_empty());
}
