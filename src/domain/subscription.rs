//! Subscription domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status value of a billable, currently-running subscription
pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";

/// Subscription plan entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
}

/// Module inclusion row for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlanModule {
    pub plan_id: i64,
    pub module_id: i64,
    pub is_included: bool,
}

/// A company's subscription. Exactly one should be active per company at a
/// time; that is caller-enforced, not a storage constraint here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub company_id: i64,
    pub plan_id: i64,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Whether the subscription entitles the company at the given instant
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SUBSCRIPTION_STATUS_ACTIVE
            && self.start_date <= now
            && self.end_date.is_none_or(|end| end > now)
    }
}
