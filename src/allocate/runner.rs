use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use super::{assign_oasis, assign_project_rooms, OasisCandidate, Scope};
use crate::catalog::RoomCatalog;
use crate::config::{AllocatorConfig, PoolEligibilityPolicy};
use crate::error::AllocationError;
use crate::preferences::TeamPreference;
use crate::store::MemoryStore;
use crate::week::Week;

/// What a finished allocation run reports back to the administrator.
#[derive(Debug, Clone)]
pub struct AllocationReport {
    pub scope: Scope,
    pub week_anchor: NaiveDate,
    /// Assignments written for the target week.
    pub written: usize,
    /// Prior assignments for the same week and scope that were replaced.
    pub replaced: usize,
    /// Occupants no valid assignment could be found for. Surfaced so the
    /// operator can intervene manually; never swallowed.
    pub unplaced: Vec<String>,
}

fn routes_to_pool(team: &TeamPreference, policy: &PoolEligibilityPolicy) -> bool {
    match policy {
        PoolEligibilityPolicy::ByTeamSize { threshold } => team.party_size < *threshold,
        PoolEligibilityPolicy::SeparateForm => false,
    }
}

/// Runs one full allocation: validates the week anchor, computes the passes
/// for the requested scope, and swaps the result into the store.
///
/// The store is only touched once, after the whole computation succeeded, and
/// `replace_week` deletes nothing outside the target week and scope. Any
/// failure before that leaves the store exactly as it was.
pub fn run_allocation(
    store: &mut MemoryStore,
    catalog: &RoomCatalog,
    config: &AllocatorConfig,
    week_anchor: NaiveDate,
    scope: Scope,
    seed: u64,
) -> Result<AllocationReport, AllocationError> {
    let week = Week::from_anchor(week_anchor)?;
    let mut rng = StdRng::seed_from_u64(seed);
    info!(
        "allocation run: week of {}, scope {:?}, seed {}",
        week_anchor, scope, seed
    );

    let mut assignments = Vec::new();
    let mut unplaced = Vec::new();
    let mut scoped_resources = std::collections::HashSet::new();

    if scope.includes_project() {
        let teams: Vec<TeamPreference> = store
            .team_preferences()
            .iter()
            .filter(|t| !routes_to_pool(t, &config.pool_policy))
            .cloned()
            .collect();
        let outcome =
            assign_project_rooms(&teams, &catalog.project_rooms, &week, config, &mut rng);
        info!(
            "project pass: {} teams, {} assignments, {} unplaced",
            teams.len(),
            outcome.assignments.len(),
            outcome.unplaced.len()
        );
        assignments.extend(outcome.assignments);
        unplaced.extend(outcome.unplaced);
        scoped_resources.extend(catalog.project_room_names());
    }

    if scope.includes_oasis() {
        let pool = catalog.pool().ok_or_else(|| {
            AllocationError::Config("catalog has no shared-pool room".to_string())
        })?;
        let mut candidates: Vec<OasisCandidate> = store
            .oasis_preferences()
            .iter()
            .map(|p| OasisCandidate {
                occupant_id: p.occupant_id.clone(),
                head_count: 1,
                preferred_days: p.preferred_days.clone(),
            })
            .collect();
        // Under team-size routing, small teams take pool seats per head
        candidates.extend(
            store
                .team_preferences()
                .iter()
                .filter(|t| routes_to_pool(t, &config.pool_policy))
                .map(|t| OasisCandidate {
                    occupant_id: t.occupant_id.clone(),
                    head_count: t.party_size,
                    preferred_days: t.preferred_days.clone(),
                }),
        );
        let outcome = assign_oasis(&candidates, pool, &week, &mut rng);
        info!(
            "oasis pass: {} candidates, {} admissions, {} unplaced",
            candidates.len(),
            outcome.assignments.len(),
            outcome.unplaced.len()
        );
        assignments.extend(outcome.assignments);
        unplaced.extend(outcome.unplaced);
        scoped_resources.extend(catalog.pool_names());
    }

    if !unplaced.is_empty() {
        warn!("unplaced occupants: {}", unplaced.join(", "));
    }

    let written = assignments.len();
    let replaced = store.replace_week(&scoped_resources, &week.dates(), assignments);
    info!("replaced {} prior assignment(s), wrote {}", replaced, written);

    Ok(AllocationReport {
        scope,
        week_anchor,
        written,
        replaced,
        unplaced,
    })
}
