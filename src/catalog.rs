use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AllocationError;

/// A bookable office resource: either a project room (one team per day) or
/// the shared seating pool (per-head daily capacity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub is_shared_pool: bool,
}

/// The partition of the catalog into exclusive rooms and shared pools.
///
/// Observed deployments have exactly one pool, but the catalog does not
/// enforce that cardinality.
#[derive(Debug, Clone)]
pub struct RoomCatalog {
    pub project_rooms: Vec<Room>,
    pub pools: Vec<Room>,
}

impl RoomCatalog {
    /// Partitions and validates a raw room list. A room is a shared pool if
    /// its record says so or its name matches the configured pool sentinel.
    pub fn from_rooms(mut rooms: Vec<Room>, pool_name: &str) -> Result<Self, AllocationError> {
        if rooms.is_empty() {
            return Err(AllocationError::Config(
                "room catalog is empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for room in &rooms {
            if room.name.trim().is_empty() {
                return Err(AllocationError::Config(
                    "room catalog contains a room with an empty name".to_string(),
                ));
            }
            if !seen.insert(room.name.clone()) {
                return Err(AllocationError::Config(format!(
                    "duplicate room name in catalog: {}",
                    room.name
                )));
            }
            if room.capacity < 1 {
                return Err(AllocationError::Config(format!(
                    "room {} has capacity 0",
                    room.name
                )));
            }
        }
        for room in &mut rooms {
            if room.name == pool_name {
                room.is_shared_pool = true;
            }
        }
        let (pools, project_rooms) = rooms.into_iter().partition(|r| r.is_shared_pool);
        Ok(RoomCatalog {
            project_rooms,
            pools,
        })
    }

    /// The shared pool, when the catalog has one.
    pub fn pool(&self) -> Option<&Room> {
        self.pools.first()
    }

    pub fn project_room_names(&self) -> HashSet<String> {
        self.project_rooms.iter().map(|r| r.name.clone()).collect()
    }

    pub fn pool_names(&self) -> HashSet<String> {
        self.pools.iter().map(|r| r.name.clone()).collect()
    }
}

/// Loads the room catalog from a JSON file: a list of `{name, capacity}`
/// records, one of which is named to match the shared-pool sentinel.
pub fn load_rooms<P: AsRef<Path>>(
    path: P,
    pool_name: &str,
) -> Result<RoomCatalog, AllocationError> {
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        AllocationError::Config(format!(
            "cannot read room catalog {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let rooms: Vec<Room> = serde_json::from_str(&raw).map_err(|e| {
        AllocationError::Config(format!(
            "cannot parse room catalog {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    RoomCatalog::from_rooms(rooms, pool_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str, capacity: u32) -> Room {
        Room {
            name: name.to_string(),
            capacity,
            is_shared_pool: false,
        }
    }

    #[test]
    fn test_partition_by_pool_sentinel() {
        let catalog = RoomCatalog::from_rooms(
            vec![room("Room A", 4), room("Room B", 6), room("Oasis", 12)],
            "Oasis",
        )
        .unwrap();
        assert_eq!(catalog.project_rooms.len(), 2);
        assert_eq!(catalog.pool().unwrap().name, "Oasis");
        assert_eq!(catalog.pool().unwrap().capacity, 12);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = RoomCatalog::from_rooms(vec![room("Room A", 4), room("Room A", 6)], "Oasis")
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RoomCatalog::from_rooms(vec![room("Room A", 0)], "Oasis").unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(RoomCatalog::from_rooms(vec![], "Oasis").is_err());
    }

    #[test]
    fn test_catalog_without_pool() {
        let catalog = RoomCatalog::from_rooms(vec![room("Room A", 4)], "Oasis").unwrap();
        assert!(catalog.pool().is_none());
        assert_eq!(catalog.project_rooms.len(), 1);
    }

    #[test]
    fn test_explicit_pool_flag() {
        let mut r = room("Quiet Zone", 8);
        r.is_shared_pool = true;
        let catalog = RoomCatalog::from_rooms(vec![r, room("Room A", 4)], "Oasis").unwrap();
        assert_eq!(catalog.pool().unwrap().name, "Quiet Zone");
    }
}
