//! Module catalog domain models

use super::permission::PermissionSet;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscription tier granted to every company regardless of plan
pub const BASIC_TIER: &str = "basic";

/// An addressable feature gated by subscription tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: i64,
    pub category: String,
    pub parent_id: Option<i64>,
    /// `None` or `"basic"` means the module is visible without a paid plan
    pub subscription_tier: Option<String>,
    pub is_active: bool,
}

impl Module {
    /// Whether the module falls under the minimum (fallback) tier
    pub fn is_basic_tier(&self) -> bool {
        match self.subscription_tier.as_deref() {
            None | Some("") => true,
            Some(tier) => tier == BASIC_TIER,
        }
    }
}

/// In-memory filter applied after the permission map is resolved
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleFilter {
    pub category: Option<String>,
    /// Case-insensitive substring match on the category
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// A module the user can reach, with the bits that got them there
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibleModule {
    pub id: i64,
    pub category: String,
    pub parent_id: Option<i64>,
    pub subscription_tier: Option<String>,
    pub permissions: PermissionSet,
}

impl AccessibleModule {
    pub fn new(module: Module, permissions: PermissionSet) -> Self {
        Self {
            id: module.id,
            category: module.category,
            parent_id: module.parent_id,
            subscription_tier: module.subscription_tier,
            permissions,
        }
    }
}

/// One page of accessible modules plus the pre-pagination total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedModules {
    pub items: Vec<AccessibleModule>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
