//! Read-only query seam consumed by systems.

use std::time::Duration;

use glam::Vec2;

use crate::{
    BuildingId, BuildingKind, EntityRef, GridView, Health, PlayMode, ProjectileId, Team,
    TileCoord, UnitArchetype, UnitId, UnitProfile, UnitState,
};

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Identifier allocated to the unit by the world.
    pub id: UnitId,
    /// Side the unit fights for.
    pub team: Team,
    /// Behavioural class of the unit.
    pub archetype: UnitArchetype,
    /// Combat statistics applied to the unit.
    pub profile: UnitProfile,
    /// World-space position of the unit.
    pub position: Vec2,
    /// Remaining health.
    pub health: Health,
    /// Active state machine state.
    pub state: UnitState,
    /// Entity the unit currently pursues, if any.
    pub target: Option<EntityRef>,
    /// Waypoints of the unit's active path.
    pub waypoints: Vec<Vec2>,
    /// Index of the next waypoint to reach.
    pub path_cursor: usize,
    /// Simulation time of the most recent attack.
    pub last_attack_at: Option<Duration>,
    /// Unit vector the unit currently faces.
    pub facing: Vec2,
}

impl UnitSnapshot {
    /// Waypoint the unit is currently walking toward, if any remain.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.path_cursor).copied()
    }

    /// Reports whether the attack cooldown has elapsed at `now`.
    #[must_use]
    pub fn attack_ready(&self, now: Duration) -> bool {
        cooldown_elapsed(self.last_attack_at, now, self.profile.attack_interval())
    }
}

/// Immutable representation of a single building's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingSnapshot {
    /// Identifier allocated to the building by the world.
    pub id: BuildingId,
    /// Type of building.
    pub kind: BuildingKind,
    /// Side owning the building.
    pub team: Team,
    /// Tile occupied by the building.
    pub tile: TileCoord,
    /// World-space centre of the occupied tile.
    pub position: Vec2,
    /// Remaining health.
    pub health: Health,
    /// Upgrade level, starting at one.
    pub level: u32,
    /// Unit the building is shooting at, for defenders.
    pub target: Option<UnitId>,
    /// Simulation time of the most recent shot.
    pub last_attack_at: Option<Duration>,
}

/// Classifies a resolved target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A combat unit of the provided archetype.
    Unit(UnitArchetype),
    /// A building of the provided kind.
    Building(BuildingKind),
}

/// Live attackable entity as seen by target searches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSnapshot {
    /// Reference used to address the entity in commands.
    pub entity: EntityRef,
    /// Side the entity belongs to.
    pub team: Team,
    /// Classification of the entity.
    pub kind: TargetKind,
    /// World-space position of the entity.
    pub position: Vec2,
    /// Remaining health.
    pub health: Health,
    /// Whether generic target searches may select the entity.
    pub targetable: bool,
    /// Tile physically occupied by the entity, for buildings.
    pub tile: Option<TileCoord>,
}

/// In-flight homing projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier allocated to the projectile by the world.
    pub id: ProjectileId,
    /// Unit that fired the projectile.
    pub owner: UnitId,
    /// Entity the projectile homes in on.
    pub target: EntityRef,
    /// World-space position of the projectile.
    pub position: Vec2,
    /// Damage applied on impact.
    pub damage: f32,
    /// Simulated time the projectile has been in flight.
    pub age: Duration,
}

/// Unit position returned by proximity queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitPresence {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Side the unit fights for.
    pub team: Team,
    /// World-space position of the unit.
    pub position: Vec2,
}

/// Query surface that systems use to observe the battlefield.
///
/// Every method reflects the state after the most recently applied command.
/// Entities that died or were removed never resolve.
pub trait Battlefield {
    /// Read-only view of the tile grid.
    fn grid(&self) -> GridView<'_>;

    /// Total simulated time elapsed.
    fn now(&self) -> Duration;

    /// Active play mode.
    fn play_mode(&self) -> PlayMode;

    /// Snapshot of a live unit.
    fn unit(&self, id: UnitId) -> Option<UnitSnapshot>;

    /// Snapshot of a live building.
    fn building(&self, id: BuildingId) -> Option<BuildingSnapshot>;

    /// Resolves a weak entity reference into a live target.
    fn resolve(&self, entity: EntityRef) -> Option<TargetSnapshot>;

    /// Every live entity opposing `team`, ordered by entity reference.
    fn hostile_targets(&self, team: Team) -> Vec<TargetSnapshot>;

    /// Every live building opposing `team`, ordered by entity reference.
    fn hostile_buildings(&self, team: Team) -> Vec<TargetSnapshot> {
        self.hostile_targets(team)
            .into_iter()
            .filter(|target| matches!(target.kind, TargetKind::Building(_)))
            .collect()
    }

    /// Every live unit whose position lies within `radius` of `point`,
    /// ordered by unit id.
    fn units_within(&self, point: Vec2, radius: f32) -> Vec<UnitPresence>;
}

/// Reports whether an attack interval has elapsed since `last`.
///
/// An entity that never attacked is always ready.
#[must_use]
pub fn cooldown_elapsed(last: Option<Duration>, now: Duration, interval: Duration) -> bool {
    match last {
        None => true,
        Some(last) => now.saturating_sub(last) >= interval,
    }
}
