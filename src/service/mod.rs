//! Business logic layer

pub mod access_decision;
pub mod basic_permission;
pub mod effective_units;
pub mod unit_permission;
pub mod unit_role_admin;

pub use access_decision::AccessDecisionPoint;
pub use basic_permission::BasicPermissionResolver;
pub use effective_units::{EffectiveUnitResolver, MAX_ANCESTOR_HOPS};
pub use unit_permission::UnitPermissionResolver;
pub use unit_role_admin::UnitRoleService;
