//! # Authentication Module
//!
//! Token issuance and validation, the role-based authorization gate, and
//! the middleware that binds a browser's cookies to a session for each
//! request.

pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use gate::{AppRoute, Decision, MenuItem};
pub use jwt::{TokenCodec, TokenScheme};
pub use middleware::{SessionExt, SessionMiddleware};
pub use models::{Role, SessionState, User};
