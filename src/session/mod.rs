//! # Session Module
//!
//! The authentication state machine: restore, login, signup, logout and
//! role changes over persisted tokens.

pub mod manager;

pub use manager::AuthSessionManager;
