#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the auto-battle engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values.
//! Systems observe the battlefield exclusively through the [`Battlefield`]
//! query trait and the read-only [`GridView`], and respond with new command
//! batches.

mod battlefield;
mod grid;
mod stats;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use battlefield::{
    cooldown_elapsed, Battlefield, BuildingSnapshot, ProjectileSnapshot, TargetKind,
    TargetSnapshot, UnitPresence, UnitSnapshot,
};
pub use grid::{GridView, Tile, TileCoord, DEFAULT_TILE_COST};
pub use stats::{BlastProfile, BuildingKind, DefenseProfile, Health, UnitArchetype, UnitProfile};

/// Canonical banner emitted when the runner boots.
pub const WELCOME_BANNER: &str = "Auto-battle combat core.";

/// Describes the active gameplay mode for the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    /// Planning phase; buildings may be placed and systems stay quiet.
    #[default]
    Preparation,
    /// Combat phase where units and defenders act.
    Battle,
}

/// Side an entity fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The attacking army controlled by the player.
    Player,
    /// The defending base.
    Enemy,
}

impl Team {
    /// Side opposing this one.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// States of the per-unit combat state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Searching for a target or waiting to retry.
    #[default]
    Idle,
    /// Following a path toward the held target.
    Moving,
    /// Within range of the held target and attacking on cooldown.
    Attacking,
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Non-owning reference to an attackable entity.
///
/// References are resolved through the world each time they are used; a
/// reference to a removed entity simply fails to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    /// A combat unit.
    Unit(UnitId),
    /// A building.
    Building(BuildingId),
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Regenerates the tile grid and clears every entity.
    ConfigureGrid {
        /// Number of tile columns.
        columns: u32,
        /// Number of tile rows.
        rows: u32,
        /// Side length of each square tile in world units.
        cell_size: f32,
        /// World-space position of the grid's upper-left corner.
        origin: Vec2,
    },
    /// Requests that the world transition to the provided play mode.
    SetPlayMode {
        /// Mode the world should activate.
        mode: PlayMode,
    },
    /// Advances the simulation clock and in-flight projectiles.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Changes the obstruction state of a tile without assigning an occupant.
    SetTileBlocked {
        /// Tile to update.
        tile: TileCoord,
        /// Whether the tile should obstruct movement.
        blocked: bool,
    },
    /// Changes the movement cost multiplier of a tile.
    SetTileCost {
        /// Tile to update.
        tile: TileCoord,
        /// New cost multiplier.
        cost: f32,
    },
    /// Requests creation of a unit on the provided tile.
    SpawnUnit {
        /// Behavioural class of the unit.
        archetype: UnitArchetype,
        /// Side the unit fights for.
        team: Team,
        /// Tile whose centre becomes the unit's position.
        tile: TileCoord,
        /// Statistics overriding the archetype defaults.
        profile: Option<UnitProfile>,
    },
    /// Requests placement of a building on the provided tile.
    PlaceBuilding {
        /// Type of building to construct.
        kind: BuildingKind,
        /// Side owning the building.
        team: Team,
        /// Tile the building occupies.
        tile: TileCoord,
        /// Upgrade level, starting at one.
        level: u32,
        /// Health overriding the kind's default.
        health: Option<Health>,
    },
    /// Requests removal of an existing building.
    RemoveBuilding {
        /// Identifier of the building to remove.
        building: BuildingId,
    },
    /// Removes a unit without killing it.
    DespawnUnit {
        /// Identifier of the unit to remove.
        unit: UnitId,
    },
    /// Replaces the unit's held target.
    SetUnitTarget {
        /// Unit whose target changes.
        unit: UnitId,
        /// New target, or `None` to clear.
        target: Option<EntityRef>,
    },
    /// Replaces the unit's path and resets its cursor.
    AssignPath {
        /// Unit receiving the path.
        unit: UnitId,
        /// Ordered world-space waypoints.
        waypoints: Vec<Vec2>,
    },
    /// Moves a unit along its path.
    MoveUnit {
        /// Unit being moved.
        unit: UnitId,
        /// New world-space position.
        position: Vec2,
        /// Index of the next waypoint after the move.
        path_cursor: usize,
    },
    /// Displaces a unit without touching its path.
    NudgeUnit {
        /// Unit being displaced.
        unit: UnitId,
        /// World-space displacement.
        offset: Vec2,
    },
    /// Transitions a unit's state machine.
    SetUnitState {
        /// Unit changing state.
        unit: UnitId,
        /// State to enter.
        state: UnitState,
    },
    /// Applies instant damage from an attacker to its target.
    Strike {
        /// Entity performing the attack.
        attacker: EntityRef,
        /// Entity receiving the attack.
        target: EntityRef,
        /// Damage to deal.
        damage: f32,
    },
    /// Fires a homing projectile from a unit.
    LaunchProjectile {
        /// Unit firing the projectile.
        owner: UnitId,
        /// Entity the projectile homes in on.
        target: EntityRef,
        /// Damage applied on impact.
        damage: f32,
    },
    /// Triggers a unit's blast and removes the unit.
    Detonate {
        /// Demolition unit that detonates.
        unit: UnitId,
    },
    /// Replaces a defender's held target.
    SetDefenseTarget {
        /// Defending building.
        building: BuildingId,
        /// New target, or `None` to clear.
        target: Option<UnitId>,
    },
    /// Applies damage from an external collaborator.
    ApplyDamage {
        /// Entity receiving the damage.
        target: EntityRef,
        /// Damage to deal.
        amount: f32,
        /// Entity credited with the damage, if any.
        source: Option<EntityRef>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the grid was regenerated.
    GridConfigured {
        /// Number of tile columns.
        columns: u32,
        /// Number of tile rows.
        rows: u32,
        /// Side length of each tile in world units.
        cell_size: f32,
    },
    /// Announces that the simulation entered a new play mode.
    PlayModeChanged {
        /// Mode that became active.
        mode: PlayMode,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that a tile's obstruction state actually changed.
    TileChanged {
        /// Tile whose state changed.
        tile: TileCoord,
        /// Obstruction state after the change.
        blocked: bool,
    },
    /// Confirms that a unit was created.
    UnitSpawned {
        /// Identifier assigned to the unit.
        unit: UnitId,
        /// Behavioural class of the unit.
        archetype: UnitArchetype,
        /// Side the unit fights for.
        team: Team,
        /// Tile the unit was spawned on.
        tile: TileCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Archetype requested.
        archetype: UnitArchetype,
        /// Tile requested.
        tile: TileCoord,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a building was placed.
    BuildingPlaced {
        /// Identifier assigned to the building.
        building: BuildingId,
        /// Type of building.
        kind: BuildingKind,
        /// Side owning the building.
        team: Team,
        /// Tile occupied by the building.
        tile: TileCoord,
    },
    /// Reports that a placement request was rejected.
    PlacementRejected {
        /// Type of building requested.
        kind: BuildingKind,
        /// Tile requested.
        tile: TileCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a building was removed without being destroyed.
    BuildingRemoved {
        /// Identifier of the removed building.
        building: BuildingId,
        /// Tile the building occupied.
        tile: TileCoord,
    },
    /// Reports a unit state machine transition.
    UnitStateChanged {
        /// Unit that transitioned.
        unit: UnitId,
        /// State before the transition.
        from: UnitState,
        /// State after the transition.
        to: UnitState,
    },
    /// Reports that a unit or defender picked a target.
    TargetAcquired {
        /// Entity holding the target.
        holder: EntityRef,
        /// Entity being targeted.
        target: EntityRef,
    },
    /// Reports that a unit or defender dropped its target.
    TargetCleared {
        /// Entity that held the target.
        holder: EntityRef,
    },
    /// Reports that a unit received a new path.
    PathAssigned {
        /// Unit receiving the path.
        unit: UnitId,
        /// Waypoints of the path.
        waypoints: Vec<Vec2>,
    },
    /// Presentation hook raised when an attacker turns toward its target.
    FacingChanged {
        /// Entity that turned.
        entity: EntityRef,
        /// Unit vector the entity now faces.
        facing: Vec2,
    },
    /// Reports damage that was actually dealt.
    DamageApplied {
        /// Entity credited with the damage, if any.
        source: Option<EntityRef>,
        /// Entity that received the damage.
        target: EntityRef,
        /// Damage dealt after clamping to remaining health.
        amount: f32,
    },
    /// Confirms that a projectile was fired.
    ProjectileLaunched {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Unit that fired.
        owner: UnitId,
        /// Entity the projectile homes in on.
        target: EntityRef,
    },
    /// Reports that a projectile left the battlefield.
    ProjectileResolved {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Whether the projectile reached its target.
        hit: bool,
    },
    /// Reports that a demolition unit detonated.
    Detonated {
        /// Unit that detonated.
        unit: UnitId,
        /// World-space centre of the blast.
        position: Vec2,
        /// Buildings that took blast damage.
        damaged: Vec<BuildingId>,
    },
    /// Reports that a unit ran out of health.
    UnitDied {
        /// Identifier of the unit.
        unit: UnitId,
        /// Side the unit fought for.
        team: Team,
        /// Behavioural class of the unit.
        archetype: UnitArchetype,
    },
    /// Reports that a unit was removed without dying.
    UnitDespawned {
        /// Identifier of the unit.
        unit: UnitId,
    },
    /// Reports that a building ran out of health.
    BuildingDestroyed {
        /// Identifier of the building.
        building: BuildingId,
        /// Type of building.
        kind: BuildingKind,
        /// Side that owned the building.
        team: Team,
        /// Tile the building occupied.
        tile: TileCoord,
    },
}

/// Reasons a building placement request may be rejected by the world.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum PlacementError {
    /// The simulation is not in preparation mode, so placement is disabled.
    #[error("buildings can only be placed during preparation")]
    InvalidMode,
    /// The requested tile lies outside the grid.
    #[error("tile lies outside the grid")]
    OutOfBounds,
    /// The requested tile is already blocked or occupied.
    #[error("tile is already occupied")]
    Occupied,
}

/// Reasons a unit spawn request may be rejected by the world.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum SpawnError {
    /// The requested tile lies outside the grid.
    #[error("tile lies outside the grid")]
    OutOfBounds,
    /// The requested tile is not walkable.
    #[error("tile is blocked")]
    Blocked,
}

/// Persisted description of a unit, as needed to reconstruct an army.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Behavioural class of the unit.
    pub archetype: UnitArchetype,
    /// Tile the unit occupies.
    pub tile: TileCoord,
}

/// Persisted description of a building, as needed to reconstruct a base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Type of building.
    pub kind: BuildingKind,
    /// Tile the building occupies.
    pub tile: TileCoord,
    /// Upgrade level.
    pub level: u32,
}

#[cfg(test)]
mod tests {
    use super::{
        BuildingKind, BuildingRecord, EntityRef, BuildingId, PlacementError, SpawnError, Team,
        TileCoord, UnitArchetype, UnitId, UnitRecord,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn unit_record_round_trips_through_bincode() {
        assert_round_trip(&UnitRecord {
            archetype: UnitArchetype::Giant,
            tile: TileCoord::new(3, 7),
        });
    }

    #[test]
    fn building_record_round_trips_through_bincode() {
        assert_round_trip(&BuildingRecord {
            kind: BuildingKind::Defense,
            tile: TileCoord::new(-2, 11),
            level: 4,
        });
    }

    #[test]
    fn errors_round_trip_through_bincode() {
        assert_round_trip(&PlacementError::Occupied);
        assert_round_trip(&SpawnError::Blocked);
    }

    #[test]
    fn entity_refs_order_units_before_buildings() {
        let mut refs = vec![
            EntityRef::Building(BuildingId::new(0)),
            EntityRef::Unit(UnitId::new(5)),
            EntityRef::Unit(UnitId::new(1)),
        ];
        refs.sort();
        assert_eq!(
            refs,
            vec![
                EntityRef::Unit(UnitId::new(1)),
                EntityRef::Unit(UnitId::new(5)),
                EntityRef::Building(BuildingId::new(0)),
            ]
        );
    }

    #[test]
    fn opponent_is_an_involution() {
        for team in [Team::Player, Team::Enemy] {
            assert_ne!(team.opponent(), team);
            assert_eq!(team.opponent().opponent(), team);
        }
    }

    #[test]
    fn errors_render_readable_messages() {
        assert_eq!(
            PlacementError::InvalidMode.to_string(),
            "buildings can only be placed during preparation"
        );
        assert_eq!(SpawnError::OutOfBounds.to_string(), "tile lies outside the grid");
    }
}
