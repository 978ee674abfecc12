//! Configuration management for AccessHub Core

use crate::policy::{AdminRoleRule, ReservedGrant};
use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Access policy configuration
    pub access_policy: AccessPolicyConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Access policy configuration
///
/// Both tables ship with built-in defaults and can be overridden with JSON
/// in `ACCESS_RESERVED_GRANTS` / `ACCESS_ADMIN_ROLE_MATRIX`, so deployments
/// can audit and adjust them without a rebuild.
#[derive(Debug, Clone)]
pub struct AccessPolicyConfig {
    /// Role-ID to reserved module-ID range grants
    pub reserved_grants: Vec<ReservedGrant>,
    /// Role-name to admin scope rows
    pub admin_roles: Vec<AdminRoleRule>,
}

impl Default for AccessPolicyConfig {
    fn default() -> Self {
        Self {
            reserved_grants: ReservedGrant::builtin(),
            admin_roles: AdminRoleRule::builtin(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            access_policy: {
                let reserved_grants: Vec<ReservedGrant> = env::var("ACCESS_RESERVED_GRANTS")
                    .ok()
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or_else(ReservedGrant::builtin);

                let admin_roles: Vec<AdminRoleRule> = env::var("ACCESS_ADMIN_ROLE_MATRIX")
                    .ok()
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or_else(AdminRoleRule::builtin);

                AccessPolicyConfig {
                    reserved_grants,
                    admin_roles,
                }
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
