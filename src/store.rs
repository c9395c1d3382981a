use std::collections::HashSet;

use chrono::NaiveDate;

use crate::allocate::Assignment;
use crate::preferences::{OasisPreference, TeamPreference};

/// In-memory stand-in for the three tables the surrounding system provides:
/// team preferences, oasis preferences, and weekly allocations.
///
/// The web layer wraps this in a `Mutex`, which also serializes concurrent
/// admin triggers for the same week.
#[derive(Debug, Default)]
pub struct MemoryStore {
    team_prefs: Vec<TeamPreference>,
    oasis_prefs: Vec<OasisPreference>,
    assignments: Vec<Assignment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Records a team submission. A re-submission merges with the existing
    /// row; the merged day set may not exceed `max_days` (the form-side rule:
    /// a team votes for at most its day allowance across all submissions).
    pub fn upsert_team_preference(
        &mut self,
        pref: TeamPreference,
        max_days: usize,
    ) -> Result<(), String> {
        if pref.preferred_days.len() > max_days {
            return Err(format!(
                "{} selected {} days, the maximum is {}",
                pref.occupant_id,
                pref.preferred_days.len(),
                max_days
            ));
        }
        if let Some(existing) = self
            .team_prefs
            .iter_mut()
            .find(|p| p.occupant_id == pref.occupant_id)
        {
            let mut merged = existing.preferred_days.clone();
            for day in &pref.preferred_days {
                if !merged.contains(day) {
                    merged.push(*day);
                }
            }
            if merged.len() > max_days {
                return Err(format!(
                    "{} already voted for {} day(s); adding these would exceed {}",
                    pref.occupant_id,
                    existing.preferred_days.len(),
                    max_days
                ));
            }
            existing.contact = pref.contact;
            existing.party_size = pref.party_size;
            existing.preferred_days = merged;
            existing.submitted_at = pref.submitted_at;
        } else {
            self.team_prefs.push(pref);
        }
        Ok(())
    }

    /// Records an individual's shared-pool sign-up. Re-submissions replace.
    pub fn upsert_oasis_preference(
        &mut self,
        pref: OasisPreference,
        max_days: usize,
    ) -> Result<(), String> {
        if pref.preferred_days.len() > max_days {
            return Err(format!(
                "{} selected {} days, the maximum is {}",
                pref.occupant_id,
                pref.preferred_days.len(),
                max_days
            ));
        }
        if let Some(existing) = self
            .oasis_prefs
            .iter_mut()
            .find(|p| p.occupant_id == pref.occupant_id)
        {
            *existing = pref;
        } else {
            self.oasis_prefs.push(pref);
        }
        Ok(())
    }

    pub fn load_team_preferences(&mut self, prefs: Vec<TeamPreference>) {
        self.team_prefs = prefs;
    }

    pub fn load_oasis_preferences(&mut self, prefs: Vec<OasisPreference>) {
        self.oasis_prefs = prefs;
    }

    pub fn team_preferences(&self) -> &[TeamPreference] {
        &self.team_prefs
    }

    pub fn oasis_preferences(&self) -> &[OasisPreference] {
        &self.oasis_prefs
    }

    /// Administrative reset of all submitted preferences.
    pub fn reset_preferences(&mut self) {
        self.team_prefs.clear();
        self.oasis_prefs.clear();
    }

    /// Administrative reset of all allocations.
    pub fn reset_allocations(&mut self) {
        self.assignments.clear();
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Assignments that fall on any of the given dates.
    pub fn assignments_on(&self, dates: &[NaiveDate]) -> Vec<Assignment> {
        self.assignments
            .iter()
            .filter(|a| dates.contains(&a.date))
            .cloned()
            .collect()
    }

    /// Replaces one week's assignments for one set of resources in a single
    /// step: deletes only the rows whose resource is in `resource_names` AND
    /// whose date is one of `week_dates`, then inserts the new rows. Rows for
    /// other weeks or other resources are untouched; there is no blanket
    /// delete. Returns how many rows were removed.
    pub fn replace_week(
        &mut self,
        resource_names: &HashSet<String>,
        week_dates: &[NaiveDate],
        new: Vec<Assignment>,
    ) -> usize {
        let before = self.assignments.len();
        self.assignments.retain(|a| {
            !(resource_names.contains(&a.resource_name) && week_dates.contains(&a.date))
        });
        let removed = before - self.assignments.len();
        self.assignments.extend(new);
        removed
    }
}
