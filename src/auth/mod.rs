//! Authentication module for the blog backend
//!
//! This module issues bearer credentials, verifies them on protected
//! routes, and exposes the authenticated identity to handlers.

pub mod context;
pub mod handlers;
pub mod middleware;
mod service;

pub use context::{AuthContext, SubjectId};
pub use middleware::RequireAuth;
pub use service::{Claims, TokenGate};
