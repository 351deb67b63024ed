//! Session Middleware
//!
//! Axum middleware that turns a browser's cookies into a session for the
//! duration of one request.
//!
//! The cookies for the three session keys seed a request-scoped
//! [`MemoryStore`]. An [`AuthSessionManager`] over that store restores the
//! session and is handed to handlers as a request extension. Whatever the
//! manager persisted by the time the handler returns is written back as
//! `Set-Cookie` headers, so the cookie jar plays the part of durable token
//! storage.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Value, json};

use crate::auth::gate::Decision;
use crate::auth::models::{Role, User};
use crate::server::AppState;
use crate::session::AuthSessionManager;
use crate::storage::token_store::SESSION_KEYS;
use crate::storage::{MemoryStore, TokenStore};

/// What handlers receive through `Extension`.
pub type Session = Arc<AuthSessionManager>;

/// Error response in the shape every handler returns.
pub type Rejection = (StatusCode, Json<Value>);

/// Attributes of the session cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub max_age_secs: i64,
    /// Frontend served from another site: cookies go out `Secure` with
    /// `SameSite=None`, otherwise `SameSite=Lax`.
    pub cross_site: bool,
}

pub struct SessionMiddleware;

impl SessionMiddleware {
    pub async fn attach(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
        let jar = CookieJar::from_headers(req.headers());
        let incoming: HashMap<String, String> = SESSION_KEYS
            .iter()
            .filter_map(|key| jar.get(key).map(|c| (key.to_string(), c.value().to_string())))
            .collect();

        let kv = Arc::new(MemoryStore::from_pairs(incoming.clone()));
        let session = Arc::new(AuthSessionManager::new(
            state.codec.clone(),
            TokenStore::new(kv.clone()),
            state.directory.clone(),
        ));
        let phase = session.restore();
        tracing::debug!("[SessionMiddleware] {} {} restored as {:?}", req.method(), req.uri().path(), phase);

        req.extensions_mut().insert(session);
        let mut response = next.run(req).await;

        for cookie in cookie_updates(&incoming, &kv.snapshot(), state.cookies) {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!("[SessionMiddleware] unencodable cookie {}: {}", cookie.name(), e),
            }
        }
        response
    }
}

/// Cookies that bring the browser from `before` to `after`, for the session
/// keys only. Unchanged keys produce nothing.
fn cookie_updates(
    before: &HashMap<String, String>,
    after: &HashMap<String, String>,
    policy: CookiePolicy,
) -> Vec<Cookie<'static>> {
    SESSION_KEYS
        .iter()
        .filter_map(|&key| match (before.get(key), after.get(key)) {
            (old, Some(new)) if old != Some(new) => Some(session_cookie(key, new, policy)),
            (Some(_), None) => {
                let mut cookie = session_cookie(key, "", policy);
                cookie.make_removal();
                Some(cookie)
            }
            _ => None,
        })
        .collect()
}

fn session_cookie(key: &str, value: &str, policy: CookiePolicy) -> Cookie<'static> {
    let mut cookie = Cookie::new(key.to_string(), value.to_string());
    cookie.set_http_only(true);
    if policy.cross_site {
        cookie.set_secure(true);
        cookie.set_same_site(SameSite::None);
    } else {
        cookie.set_same_site(SameSite::Lax);
    }
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(policy.max_age_secs));
    cookie
}

/// Gate decision as an HTTP error. `None` when access is allowed.
pub fn rejection_for(decision: Decision) -> Option<Rejection> {
    let redirect = decision.redirect_target()?;
    let (status, error) = match decision {
        Decision::RedirectToLogin => (StatusCode::UNAUTHORIZED, "authentication required"),
        _ => (StatusCode::FORBIDDEN, "insufficient role"),
    };
    Some((status, Json(json!({ "error": error, "redirect": redirect }))))
}

/// Extension trait for gating handlers on the request's session
pub trait SessionExt {
    fn current_user(&self) -> Option<User>;
    fn require(&self, roles: Option<&[Role]>) -> Result<User, Rejection>;
}

impl SessionExt for AuthSessionManager {
    fn current_user(&self) -> Option<User> {
        let state = self.session_state();
        state.user.filter(|_| state.is_authenticated)
    }

    fn require(&self, roles: Option<&[Role]>) -> Result<User, Rejection> {
        if let Some(rejection) = rejection_for(self.can_access(roles)) {
            return Err(rejection);
        }
        self.current_user().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication required", "redirect": crate::auth::gate::LOGIN_ROUTE })),
            )
        })
    }
}
