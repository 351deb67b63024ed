//! # Services Module
//!
//! Learning data behind the authenticated views: the backend the
//! orchestration layer dispatches to, dashboard aggregates, the per-identity
//! load orchestration and the manager/admin reports.

pub mod catalog;
pub mod models;
pub mod orchestrator;
pub mod reports;
pub mod stats;

pub use catalog::{LearningBackend, MockLearningBackend};
pub use orchestrator::{DataOrchestrator, IdentityWatcher, LearningState, LoadScope};
