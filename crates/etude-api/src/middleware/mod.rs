//! API Middleware
//!
//! Request-processing layers shared by protected routes.

pub mod auth;

pub use auth::{require_auth, AuthUser};
