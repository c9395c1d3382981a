pub mod oasis;
pub mod rooms;
pub mod runner;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use oasis::{assign_oasis, OasisCandidate};
pub use rooms::assign_project_rooms;
pub use runner::{run_allocation, AllocationReport};

/// One occupant seated in one resource on one date. The only thing the
/// allocator ever produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub occupant_id: String,
    pub resource_name: String,
    pub date: NaiveDate,
}

/// Which resources an allocation run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Project,
    Oasis,
    Both,
}

impl Scope {
    pub fn includes_project(self) -> bool {
        matches!(self, Scope::Project | Scope::Both)
    }

    pub fn includes_oasis(self) -> bool {
        matches!(self, Scope::Oasis | Scope::Both)
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "project" => Ok(Scope::Project),
            "oasis" => Ok(Scope::Oasis),
            "both" => Ok(Scope::Both),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// The outcome of one allocation pass: the assignments it made plus every
/// occupant it could not seat. Unplaced occupants are always reported, never
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub assignments: Vec<Assignment>,
    pub unplaced: Vec<String>,
}
