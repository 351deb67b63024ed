// # Routes Module
//
// - HTTP route handlers for the learning tracker API.
// - Everything under `/api` runs behind `SessionMiddleware` and receives
//   the request's session as an `Extension<Session>`.
//
// ## Available Route Modules
// - `health`: health check
// - `auth`: login, signup, logout, role changes, navigation and access checks
// - `learning`: topics, dashboard, timeline and progress updates
// - `reports`: manager and admin views over the user directory

/// Health check endpoint
pub mod health;

/// Session endpoints
pub mod auth;

/// Learning data endpoints
pub mod learning;

/// Manager and admin reports
pub mod reports;
