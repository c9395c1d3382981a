use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{Assignment, PassOutcome};
use crate::catalog::Room;
use crate::week::Week;

/// Someone asking for shared-pool seats: an individual (head count 1) or,
/// under the team-size routing policy, a small team occupying one seat per
/// member.
#[derive(Debug, Clone)]
pub struct OasisCandidate {
    pub occupant_id: String,
    pub head_count: u32,
    pub preferred_days: Vec<Weekday>,
}

/// Admits candidates to the shared pool without exceeding the per-day
/// head-count capacity.
///
/// Round 1 seeds fairness: per day, only candidates with zero confirmed days
/// are considered, in shuffled order, so nobody is shut out just because
/// their day filled up from other people's multiple preferences. After that,
/// remaining capacity is filled by repeated sweeps (one extra day per
/// candidate per sweep) until a full sweep admits nobody.
///
/// Candidates ending with zero confirmed days are reported in `unplaced`.
pub fn assign_oasis(
    candidates: &[OasisCandidate],
    pool: &Room,
    week: &Week,
    rng: &mut StdRng,
) -> PassOutcome {
    let mut headcount: HashMap<NaiveDate, u32> = HashMap::new();
    let mut confirmed: Vec<HashSet<NaiveDate>> = vec![HashSet::new(); candidates.len()];

    let fits = |headcount: &HashMap<NaiveDate, u32>, date: NaiveDate, heads: u32| {
        headcount.get(&date).copied().unwrap_or(0) + heads <= pool.capacity
    };

    // Round 1: per day, admit only candidates who have nothing yet
    for &(day, date) in week.days() {
        let mut waiting: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(i, c)| confirmed[*i].is_empty() && c.preferred_days.contains(&day))
            .map(|(i, _)| i)
            .collect();
        waiting.shuffle(rng);
        for i in waiting {
            if fits(&headcount, date, candidates[i].head_count) {
                *headcount.entry(date).or_insert(0) += candidates[i].head_count;
                confirmed[i].insert(date);
            }
        }
    }

    // Round 2..k: fill remaining capacity, one extra day per candidate per
    // sweep, until a full sweep admits nobody
    loop {
        let mut progressed = false;
        for (i, candidate) in candidates.iter().enumerate() {
            let next = candidate.preferred_days.iter().find_map(|day| {
                week.date_of(*day).filter(|date| {
                    !confirmed[i].contains(date) && fits(&headcount, *date, candidate.head_count)
                })
            });
            if let Some(date) = next {
                *headcount.entry(date).or_insert(0) += candidate.head_count;
                confirmed[i].insert(date);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let mut assignments = Vec::new();
    let mut unplaced = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        if confirmed[i].is_empty() {
            unplaced.push(candidate.occupant_id.clone());
            continue;
        }
        let mut dates: Vec<NaiveDate> = confirmed[i].iter().copied().collect();
        dates.sort();
        for date in dates {
            assignments.push(Assignment {
                occupant_id: candidate.occupant_id.clone(),
                resource_name: pool.name.clone(),
                date,
            });
        }
    }

    PassOutcome {
        assignments,
        unplaced,
    }
}
