//! Authoritative building state management utilities.

use std::{collections::BTreeMap, time::Duration};

use auto_battle_core::{
    BuildingId, BuildingKind, BuildingSnapshot, Health, Team, TileCoord, UnitId,
};
use glam::Vec2;

/// Building stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct BuildingEntry {
    pub(crate) id: BuildingId,
    pub(crate) kind: BuildingKind,
    pub(crate) team: Team,
    pub(crate) tile: TileCoord,
    pub(crate) position: Vec2,
    pub(crate) health: Health,
    pub(crate) level: u32,
    pub(crate) target: Option<UnitId>,
    pub(crate) last_attack_at: Option<Duration>,
}

impl BuildingEntry {
    pub(crate) fn snapshot(&self) -> BuildingSnapshot {
        BuildingSnapshot {
            id: self.id,
            kind: self.kind,
            team: self.team,
            tile: self.tile,
            position: self.position,
            health: self.health,
            level: self.level,
            target: self.target,
            last_attack_at: self.last_attack_at,
        }
    }
}

/// Registry that stores buildings and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct BuildingRegistry {
    entries: BTreeMap<BuildingId, BuildingEntry>,
    next_building_id: BuildingId,
}

/// Parameters describing a building about to be inserted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NewBuilding {
    pub(crate) kind: BuildingKind,
    pub(crate) team: Team,
    pub(crate) tile: TileCoord,
    pub(crate) position: Vec2,
    pub(crate) level: u32,
    pub(crate) health: Health,
}

impl BuildingRegistry {
    /// Creates an empty building registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_building_id: BuildingId::new(0),
        }
    }

    pub(crate) fn insert(&mut self, building: NewBuilding) -> BuildingId {
        let id = self.next_building_id;
        self.next_building_id = BuildingId::new(id.get().saturating_add(1));

        let entry = BuildingEntry {
            id,
            kind: building.kind,
            team: building.team,
            tile: building.tile,
            position: building.position,
            health: building.health,
            level: building.level.max(1),
            target: None,
            last_attack_at: None,
        };
        let _ = self.entries.insert(id, entry);
        id
    }

    pub(crate) fn get(&self, id: BuildingId) -> Option<&BuildingEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: BuildingId) -> Option<&mut BuildingEntry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: BuildingId) -> Option<BuildingEntry> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BuildingEntry> {
        self.entries.values()
    }

    /// Drops every building while keeping the identifier counter running.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_at(column: i32, row: i32, level: u32) -> NewBuilding {
        NewBuilding {
            kind: BuildingKind::Wall,
            team: Team::Enemy,
            tile: TileCoord::new(column, row),
            position: Vec2::ZERO,
            level,
            health: BuildingKind::Wall.max_health(),
        }
    }

    #[test]
    fn registry_allocates_sequential_identifiers() {
        let mut registry = BuildingRegistry::new();
        let first = registry.insert(wall_at(0, 0, 1));
        let second = registry.insert(wall_at(1, 0, 1));

        assert_eq!(first, BuildingId::new(0));
        assert_eq!(second, BuildingId::new(1));
        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn level_zero_is_promoted_to_one() {
        let mut registry = BuildingRegistry::new();
        let id = registry.insert(wall_at(0, 0, 0));
        assert_eq!(registry.get(id).map(|entry| entry.level), Some(1));
    }
}
