//! # Learning Tracker
//!
//! Session and authorization core of a learning tracker, with the HTTP API
//! that exposes it to a browser client.
//!
//! ## Architecture
//! - `auth`: token codec, authorization gate, session middleware
//! - `storage`: durable key-value storage and the token key layout
//! - `directory`: the known identities, seeded plus signed up
//! - `session`: the auth session manager
//! - `services`: learning data, dashboard aggregates, load orchestration, reports
//! - `server` and `routes`: the axum application
//! - `config`: environment configuration

pub mod auth;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod routes;
pub mod server;
pub mod services;
pub mod session;
pub mod storage;

pub use auth::{Decision, Role, SessionState, TokenCodec, TokenScheme, User};
pub use directory::{SessionDirectory, UserDirectory};
pub use session::AuthSessionManager;
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenStore};
