//! Effective-unit resolution
//!
//! A user's effective units are the units on their role bindings plus
//! every ancestor up the parent chain. The walk is an explicit iterative
//! frontier expansion over plain unit rows, one hop per round trip, so the
//! algorithm stays testable apart from the storage engine.

use crate::domain::Unit;
use crate::error::Result;
use crate::repository::{RoleAssignmentRepository, UnitHierarchyRepository};
use std::collections::HashSet;
use std::sync::Arc;

/// Upper bound on parent hops. Unit data is tree-shaped and should never
/// cycle; the bound keeps the read path finite if corrupt writes ever
/// violate that.
pub const MAX_ANCESTOR_HOPS: usize = 10;

pub struct EffectiveUnitResolver<R, U>
where
    R: RoleAssignmentRepository,
    U: UnitHierarchyRepository,
{
    roles: Arc<R>,
    units: Arc<U>,
}

impl<R, U> EffectiveUnitResolver<R, U>
where
    R: RoleAssignmentRepository,
    U: UnitHierarchyRepository,
{
    pub fn new(roles: Arc<R>, units: Arc<U>) -> Self {
        Self { roles, units }
    }

    /// The transitive parent-closure of the user's directly bound units.
    /// Seeds come from `UserRoleBinding.unit_id` only, never from
    /// unit-role bindings. Unordered.
    pub async fn resolve(&self, user_id: i64) -> Result<HashSet<i64>> {
        let seeds = self.roles.find_bound_unit_ids(user_id).await?;

        let mut known: HashSet<i64> = seeds.iter().copied().collect();
        let mut frontier = seeds;

        for _ in 0..MAX_ANCESTOR_HOPS {
            if frontier.is_empty() {
                break;
            }
            let units = self.units.find_by_ids(&frontier).await?;
            frontier = collect_new_parents(&units, &mut known);
        }

        Ok(known)
    }
}

/// Record each unit's parent and return the ones not seen before; those
/// form the next frontier.
fn collect_new_parents(units: &[Unit], known: &mut HashSet<i64>) -> Vec<i64> {
    units
        .iter()
        .filter_map(|unit| unit.parent_id)
        .filter(|parent_id| known.insert(*parent_id))
        .collect()
}
