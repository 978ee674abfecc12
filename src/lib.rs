//! AccessHub Core - Access Resolution Service Backend
//!
//! This crate computes the authoritative set of module-level capabilities
//! for a user by merging company-wide role grants with unit-scoped role
//! grants, filtered by the owning company's subscription entitlements,
//! and derives administrative scope (unit/branch/company).

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod repository;
pub mod server;
pub mod service;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
