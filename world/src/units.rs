//! Authoritative unit state management utilities.

use std::{collections::BTreeMap, time::Duration};

use auto_battle_core::{
    EntityRef, Health, Team, UnitArchetype, UnitId, UnitProfile, UnitSnapshot, UnitState,
};
use glam::Vec2;

/// Unit stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct UnitEntry {
    pub(crate) id: UnitId,
    pub(crate) team: Team,
    pub(crate) archetype: UnitArchetype,
    pub(crate) profile: UnitProfile,
    pub(crate) position: Vec2,
    pub(crate) health: Health,
    pub(crate) state: UnitState,
    pub(crate) target: Option<EntityRef>,
    pub(crate) waypoints: Vec<Vec2>,
    pub(crate) path_cursor: usize,
    pub(crate) last_attack_at: Option<Duration>,
    pub(crate) facing: Vec2,
}

impl UnitEntry {
    pub(crate) fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            team: self.team,
            archetype: self.archetype,
            profile: self.profile,
            position: self.position,
            health: self.health,
            state: self.state,
            target: self.target,
            waypoints: self.waypoints.clone(),
            path_cursor: self.path_cursor,
            last_attack_at: self.last_attack_at,
            facing: self.facing,
        }
    }

    /// Turns the unit toward `point`, returning the new facing when it changed.
    pub(crate) fn face(&mut self, point: Vec2) -> Option<Vec2> {
        let facing = (point - self.position).normalize_or_zero();
        if facing == Vec2::ZERO || facing == self.facing {
            return None;
        }

        self.facing = facing;
        Some(facing)
    }
}

/// Registry that stores units and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct UnitRegistry {
    entries: BTreeMap<UnitId, UnitEntry>,
    next_unit_id: UnitId,
}

impl UnitRegistry {
    /// Creates an empty unit registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_unit_id: UnitId::new(0),
        }
    }

    /// Inserts a fresh unit at `position` and returns its identifier.
    pub(crate) fn spawn(
        &mut self,
        archetype: UnitArchetype,
        team: Team,
        profile: UnitProfile,
        position: Vec2,
    ) -> UnitId {
        let id = self.next_unit_id;
        self.next_unit_id = UnitId::new(id.get().saturating_add(1));

        let entry = UnitEntry {
            id,
            team,
            archetype,
            profile,
            position,
            health: profile.max_health(),
            state: UnitState::Idle,
            target: None,
            waypoints: Vec::new(),
            path_cursor: 0,
            last_attack_at: None,
            facing: match team {
                Team::Player => Vec2::X,
                Team::Enemy => Vec2::NEG_X,
            },
        };
        let _ = self.entries.insert(id, entry);
        id
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<&UnitEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut UnitEntry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: UnitId) -> Option<UnitEntry> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &UnitEntry> {
        self.entries.values()
    }

    /// Drops every unit while keeping the identifier counter running.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
