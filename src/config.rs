use std::path::Path;

use chrono::Weekday;
use serde::Deserialize;

use crate::error::AllocationError;
use crate::week::parse_weekday;

/// Which occupants are eligible for the shared pool.
///
/// Two policies exist in the field: route teams below a size threshold into
/// the pool, or keep all teams in project rooms and feed the pool only from
/// a separate individual sign-up form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEligibilityPolicy {
    ByTeamSize { threshold: u32 },
    SeparateForm,
}

/// How ties between equally-eligible teams are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreakPolicy {
    /// Larger teams first, room name as the final key. Deterministic.
    CapacityDescending,
    /// Seeded shuffle, so fairness rotates across weeks but runs stay
    /// reproducible for a given seed.
    Randomized,
}

/// Deployment-level knobs for an allocation run.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Name of the catalog entry that acts as the shared pool.
    pub pool_name: String,
    pub pool_policy: PoolEligibilityPolicy,
    pub tie_break: TieBreakPolicy,
    /// Preferred-day combinations the grouping step recognizes.
    pub day_pairs: Vec<(Weekday, Weekday)>,
    /// Days a placed team receives. Teams end with exactly this many days or
    /// none; partial placement is not a valid outcome.
    pub team_day_count: usize,
    /// Cap on preferred days per shared-pool individual.
    pub max_oasis_days: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfig {
            pool_name: "Oasis".to_string(),
            pool_policy: PoolEligibilityPolicy::ByTeamSize { threshold: 3 },
            tie_break: TieBreakPolicy::CapacityDescending,
            day_pairs: vec![
                (Weekday::Mon, Weekday::Wed),
                (Weekday::Tue, Weekday::Thu),
            ],
            team_day_count: 2,
            max_oasis_days: 5,
        }
    }
}

/// On-disk shape of the optional allocator.json. All fields optional; missing
/// ones fall back to the defaults above.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    pool_name: Option<String>,
    pool_threshold: Option<u32>,
    separate_oasis_form: Option<bool>,
    randomized_tie_break: Option<bool>,
    day_pairs: Option<Vec<[String; 2]>>,
    team_day_count: Option<usize>,
    max_oasis_days: Option<usize>,
}

/// Loads allocator configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AllocatorConfig, AllocationError> {
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        AllocationError::Config(format!(
            "cannot read config {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| {
        AllocationError::Config(format!(
            "cannot parse config {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let mut config = AllocatorConfig::default();
    if let Some(name) = file.pool_name {
        config.pool_name = name;
    }
    if file.separate_oasis_form.unwrap_or(false) {
        config.pool_policy = PoolEligibilityPolicy::SeparateForm;
    } else if let Some(threshold) = file.pool_threshold {
        config.pool_policy = PoolEligibilityPolicy::ByTeamSize { threshold };
    }
    if file.randomized_tie_break.unwrap_or(false) {
        config.tie_break = TieBreakPolicy::Randomized;
    }
    if let Some(pairs) = file.day_pairs {
        let mut day_pairs = Vec::new();
        for [a, b] in &pairs {
            let first = parse_weekday(a).ok_or_else(|| {
                AllocationError::Config(format!("unknown weekday in day_pairs: {}", a))
            })?;
            let second = parse_weekday(b).ok_or_else(|| {
                AllocationError::Config(format!("unknown weekday in day_pairs: {}", b))
            })?;
            if first == second {
                return Err(AllocationError::Config(format!(
                    "day pair ({}, {}) repeats a day",
                    a, b
                )));
            }
            day_pairs.push((first, second));
        }
        config.day_pairs = day_pairs;
    }
    if let Some(count) = file.team_day_count {
        config.team_day_count = count;
    }
    if let Some(max) = file.max_oasis_days {
        config.max_oasis_days = max;
    }
    Ok(config)
}
