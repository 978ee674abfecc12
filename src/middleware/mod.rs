//! HTTP middleware

pub mod auth;
pub mod permission;
pub mod unit_context;

pub use auth::{require_auth, AuthUser};
pub use permission::{require_module_permission, ModuleGuard};
pub use unit_context::with_unit_context;
