#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the auto-battle engine.

mod buildings;
mod grid;
mod index;
mod projectiles;
mod units;

use std::time::Duration;

use auto_battle_core::{
    Battlefield, BuildingId, BuildingKind, BuildingSnapshot, Command, EntityRef, Event, GridView,
    Health, PlacementError, PlayMode, SpawnError, TargetKind, TargetSnapshot, Team, TileCoord,
    UnitArchetype, UnitId, UnitPresence, UnitProfile, UnitSnapshot, UnitState, WELCOME_BANNER,
};
use glam::Vec2;

use buildings::{BuildingEntry, BuildingRegistry, NewBuilding};
use grid::GridStore;
use index::{SpatialBuckets, TeamIndex};
use projectiles::{Flight, ProjectileRegistry};
use units::{UnitEntry, UnitRegistry};

const DEFAULT_GRID_COLUMNS: u32 = 10;
const DEFAULT_GRID_ROWS: u32 = 10;
const DEFAULT_CELL_SIZE: f32 = 100.0;

/// Represents the authoritative battlefield state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: GridStore,
    play_mode: PlayMode,
    clock: Duration,
    units: UnitRegistry,
    buildings: BuildingRegistry,
    projectiles: ProjectileRegistry,
    teams: TeamIndex,
    buckets: SpatialBuckets,
}

impl World {
    /// Creates a world with an empty default grid in preparation mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            grid: GridStore::new(
                DEFAULT_GRID_COLUMNS,
                DEFAULT_GRID_ROWS,
                DEFAULT_CELL_SIZE,
                Vec2::ZERO,
            ),
            play_mode: PlayMode::default(),
            clock: Duration::ZERO,
            units: UnitRegistry::new(),
            buildings: BuildingRegistry::new(),
            projectiles: ProjectileRegistry::new(),
            teams: TeamIndex::default(),
            buckets: SpatialBuckets::default(),
        }
    }

    fn bucket_tile(&self, position: Vec2) -> TileCoord {
        self.grid.view().tile_at(position)
    }

    fn set_tile_blocked(
        &mut self,
        tile: TileCoord,
        blocked: bool,
        occupant: Option<BuildingId>,
        out_events: &mut Vec<Event>,
    ) {
        if self.grid.set_blocked(tile, blocked, occupant) {
            out_events.push(Event::TileChanged { tile, blocked });
        }
    }

    fn relocate_unit(&mut self, unit: UnitId, position: Vec2) {
        let to = self.bucket_tile(position);
        let Some(entry) = self.units.get_mut(unit) else {
            return;
        };

        let from = self.grid.view().tile_at(entry.position);
        entry.position = position;
        self.buckets.relocate(unit, from, to);
    }

    fn remove_unit(&mut self, unit: UnitId) -> Option<UnitEntry> {
        let entry = self.units.remove(unit)?;
        let tile = self.bucket_tile(entry.position);
        self.buckets.remove(unit, tile);
        self.teams.remove(entry.team, EntityRef::Unit(unit));
        Some(entry)
    }

    fn remove_building(
        &mut self,
        building: BuildingId,
        out_events: &mut Vec<Event>,
    ) -> Option<BuildingEntry> {
        let entry = self.buildings.remove(building)?;
        self.teams
            .remove(entry.team, EntityRef::Building(building));
        if self.grid.occupant(entry.tile) == Some(building) {
            self.set_tile_blocked(entry.tile, false, None, out_events);
        }
        Some(entry)
    }

    fn resolve_target(&self, entity: EntityRef) -> Option<TargetSnapshot> {
        match entity {
            EntityRef::Unit(id) => {
                let unit = self.units.get(id)?;
                Some(TargetSnapshot {
                    entity,
                    team: unit.team,
                    kind: TargetKind::Unit(unit.archetype),
                    position: unit.position,
                    health: unit.health,
                    targetable: true,
                    tile: None,
                })
            }
            EntityRef::Building(id) => {
                let building = self.buildings.get(id)?;
                Some(TargetSnapshot {
                    entity,
                    team: building.team,
                    kind: TargetKind::Building(building.kind),
                    position: building.position,
                    health: building.health,
                    targetable: building.kind.is_targetable(),
                    tile: Some(building.tile),
                })
            }
        }
    }

    fn record_attack(&mut self, attacker: EntityRef) {
        let now = self.clock;
        match attacker {
            EntityRef::Unit(id) => {
                if let Some(unit) = self.units.get_mut(id) {
                    unit.last_attack_at = Some(now);
                }
            }
            EntityRef::Building(id) => {
                if let Some(building) = self.buildings.get_mut(id) {
                    building.last_attack_at = Some(now);
                }
            }
        }
    }

    fn turn_toward(&mut self, attacker: EntityRef, point: Vec2, out_events: &mut Vec<Event>) {
        let EntityRef::Unit(id) = attacker else {
            return;
        };

        if let Some(facing) = self.units.get_mut(id).and_then(|unit| unit.face(point)) {
            out_events.push(Event::FacingChanged {
                entity: attacker,
                facing,
            });
        }
    }

    fn clear_entities(&mut self) {
        self.units.clear();
        self.buildings.clear();
        self.projectiles.clear();
        self.teams.clear();
        self.buckets.clear();
    }

    fn spawn_unit(
        &mut self,
        archetype: UnitArchetype,
        team: Team,
        tile: TileCoord,
        profile: Option<UnitProfile>,
        out_events: &mut Vec<Event>,
    ) {
        let view = self.grid.view();
        let rejection = if !view.is_valid(tile) {
            Some(SpawnError::OutOfBounds)
        } else if !view.is_walkable(tile) {
            Some(SpawnError::Blocked)
        } else {
            None
        };

        if let Some(reason) = rejection {
            tracing::warn!(?archetype, ?tile, %reason, "unit spawn rejected");
            out_events.push(Event::SpawnRejected {
                archetype,
                tile,
                reason,
            });
            return;
        }

        let position = view.tile_to_world(tile);
        let profile = profile.unwrap_or_else(|| archetype.profile());
        let unit = self.units.spawn(archetype, team, profile, position);
        self.teams.insert(team, EntityRef::Unit(unit));
        self.buckets.insert(unit, tile);
        tracing::debug!(unit = unit.get(), ?archetype, ?team, ?tile, "unit spawned");
        out_events.push(Event::UnitSpawned {
            unit,
            archetype,
            team,
            tile,
        });
    }

    fn place_building(
        &mut self,
        kind: BuildingKind,
        team: Team,
        tile: TileCoord,
        level: u32,
        health: Option<Health>,
        out_events: &mut Vec<Event>,
    ) {
        let view = self.grid.view();
        let rejection = if self.play_mode != PlayMode::Preparation {
            Some(PlacementError::InvalidMode)
        } else if !view.is_valid(tile) {
            Some(PlacementError::OutOfBounds)
        } else if !view.is_walkable(tile) {
            Some(PlacementError::Occupied)
        } else {
            None
        };

        if let Some(reason) = rejection {
            tracing::warn!(?kind, ?tile, %reason, "building placement rejected");
            out_events.push(Event::PlacementRejected { kind, tile, reason });
            return;
        }

        let building = self.buildings.insert(NewBuilding {
            kind,
            team,
            tile,
            position: view.tile_to_world(tile),
            level,
            health: health.unwrap_or_else(|| kind.max_health()),
        });
        self.teams.insert(team, EntityRef::Building(building));
        out_events.push(Event::BuildingPlaced {
            building,
            kind,
            team,
            tile,
        });
        self.set_tile_blocked(tile, true, Some(building), out_events);
    }

    fn detonate(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let Some(entry) = self.units.get(unit) else {
            return;
        };
        let Some(blast) = entry.profile.blast() else {
            tracing::warn!(unit = unit.get(), "detonation requested by unit without blast");
            return;
        };

        let team = entry.team;
        let position = entry.position;
        let caught: Vec<BuildingId> = self
            .buildings
            .iter()
            .filter(|building| building.team != team)
            .filter(|building| building.position.distance(position) <= blast.radius())
            .map(|building| building.id)
            .collect();

        self.record_attack(EntityRef::Unit(unit));
        for building in &caught {
            let _ = apply_damage(
                self,
                EntityRef::Building(*building),
                blast.damage(),
                Some(EntityRef::Unit(unit)),
                out_events,
            );
        }

        tracing::info!(
            unit = unit.get(),
            buildings = caught.len(),
            "demolition unit detonated"
        );
        out_events.push(Event::Detonated {
            unit,
            position,
            damaged: caught,
        });

        if self.remove_unit(unit).is_some() {
            out_events.push(Event::UnitDespawned { unit });
        }
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for id in self.projectiles.ids() {
            let Some(target) = self.projectiles.get_mut(id).map(|projectile| projectile.target)
            else {
                continue;
            };
            let target_position = self.resolve_target(target).map(|target| target.position);

            let flight = match (target_position, self.projectiles.get_mut(id)) {
                (Some(position), Some(projectile)) => projectile.advance(position, dt),
                (None, Some(_)) => Flight::Expired,
                (_, None) => continue,
            };

            match flight {
                Flight::InFlight => {}
                Flight::Expired => {
                    let _ = self.projectiles.remove(id);
                    out_events.push(Event::ProjectileResolved {
                        projectile: id,
                        hit: false,
                    });
                }
                Flight::Arrived => {
                    let Some(projectile) = self.projectiles.remove(id) else {
                        continue;
                    };
                    out_events.push(Event::ProjectileResolved {
                        projectile: id,
                        hit: true,
                    });
                    let _ = apply_damage(
                        self,
                        projectile.target,
                        projectile.damage,
                        Some(EntityRef::Unit(projectile.owner)),
                        out_events,
                    );
                }
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid {
            columns,
            rows,
            cell_size,
            origin,
        } => {
            world.grid = GridStore::new(columns, rows, cell_size, origin);
            world.clear_entities();
            let view = world.grid.view();
            out_events.push(Event::GridConfigured {
                columns: view.columns(),
                rows: view.rows(),
                cell_size: view.cell_size(),
            });
        }
        Command::SetPlayMode { mode } => {
            if world.play_mode != mode {
                world.play_mode = mode;
                tracing::debug!(?mode, "play mode changed");
                out_events.push(Event::PlayModeChanged { mode });
            }
        }
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_projectiles(dt, out_events);
        }
        Command::SetTileBlocked { tile, blocked } => {
            let occupant = if blocked {
                world.grid.occupant(tile)
            } else {
                None
            };
            world.set_tile_blocked(tile, blocked, occupant, out_events);
        }
        Command::SetTileCost { tile, cost } => {
            let _ = world.grid.set_cost(tile, cost);
        }
        Command::SpawnUnit {
            archetype,
            team,
            tile,
            profile,
        } => world.spawn_unit(archetype, team, tile, profile, out_events),
        Command::PlaceBuilding {
            kind,
            team,
            tile,
            level,
            health,
        } => world.place_building(kind, team, tile, level, health, out_events),
        Command::RemoveBuilding { building } => {
            if let Some(entry) = world.remove_building(building, out_events) {
                out_events.push(Event::BuildingRemoved {
                    building,
                    tile: entry.tile,
                });
            }
        }
        Command::DespawnUnit { unit } => {
            if world.remove_unit(unit).is_some() {
                out_events.push(Event::UnitDespawned { unit });
            }
        }
        Command::SetUnitTarget { unit, target } => {
            let Some(entry) = world.units.get_mut(unit) else {
                return;
            };
            if entry.target == target {
                return;
            }

            entry.target = target;
            let holder = EntityRef::Unit(unit);
            out_events.push(match target {
                Some(target) => Event::TargetAcquired { holder, target },
                None => Event::TargetCleared { holder },
            });
        }
        Command::AssignPath { unit, waypoints } => {
            if let Some(entry) = world.units.get_mut(unit) {
                entry.waypoints = waypoints.clone();
                entry.path_cursor = 0;
                out_events.push(Event::PathAssigned { unit, waypoints });
            }
        }
        Command::MoveUnit {
            unit,
            position,
            path_cursor,
        } => {
            let Some(entry) = world.units.get_mut(unit) else {
                return;
            };
            entry.path_cursor = path_cursor.min(entry.waypoints.len());
            let _ = entry.face(position);
            world.relocate_unit(unit, position);
        }
        Command::NudgeUnit { unit, offset } => {
            if let Some(position) = world.units.get(unit).map(|entry| entry.position + offset) {
                world.relocate_unit(unit, position);
            }
        }
        Command::SetUnitState { unit, state } => {
            let Some(entry) = world.units.get_mut(unit) else {
                return;
            };
            let from = entry.state;
            if from == state {
                return;
            }

            entry.state = state;
            if state != UnitState::Moving {
                entry.waypoints.clear();
                entry.path_cursor = 0;
            }
            tracing::debug!(unit = unit.get(), ?from, to = ?state, "unit state changed");
            out_events.push(Event::UnitStateChanged {
                unit,
                from,
                to: state,
            });
        }
        Command::Strike {
            attacker,
            target,
            damage,
        } => {
            if world.resolve_target(attacker).is_none() {
                return;
            }
            let Some(victim) = world.resolve_target(target) else {
                return;
            };

            world.record_attack(attacker);
            world.turn_toward(attacker, victim.position, out_events);
            let _ = apply_damage(world, target, damage, Some(attacker), out_events);
        }
        Command::LaunchProjectile {
            owner,
            target,
            damage,
        } => {
            let Some(origin) = world.units.get(owner).map(|unit| unit.position) else {
                return;
            };
            let Some(victim) = world.resolve_target(target) else {
                return;
            };

            world.record_attack(EntityRef::Unit(owner));
            world.turn_toward(EntityRef::Unit(owner), victim.position, out_events);
            let projectile = world.projectiles.launch(owner, target, origin, damage);
            out_events.push(Event::ProjectileLaunched {
                projectile,
                owner,
                target,
            });
        }
        Command::Detonate { unit } => world.detonate(unit, out_events),
        Command::SetDefenseTarget { building, target } => {
            let Some(entry) = world.buildings.get_mut(building) else {
                return;
            };
            if entry.target == target {
                return;
            }

            entry.target = target;
            let holder = EntityRef::Building(building);
            out_events.push(match target {
                Some(unit) => Event::TargetAcquired {
                    holder,
                    target: EntityRef::Unit(unit),
                },
                None => Event::TargetCleared { holder },
            });
        }
        Command::ApplyDamage {
            target,
            amount,
            source,
        } => {
            let _ = apply_damage(world, target, amount, source, out_events);
        }
    }
}

/// Deals damage to a live entity and returns the amount actually removed.
///
/// Damage is clamped to the target's remaining health; missing targets take
/// nothing. A target reduced to zero health is removed from the world, and a
/// destroyed building releases the tile it occupied.
pub fn apply_damage(
    world: &mut World,
    target: EntityRef,
    amount: f32,
    source: Option<EntityRef>,
    out_events: &mut Vec<Event>,
) -> f32 {
    let (dealt, dead) = match target {
        EntityRef::Unit(id) => {
            let Some(unit) = world.units.get_mut(id) else {
                return 0.0;
            };
            let (health, dealt) = unit.health.damaged(amount);
            unit.health = health;
            (dealt, !health.is_alive())
        }
        EntityRef::Building(id) => {
            let Some(building) = world.buildings.get_mut(id) else {
                return 0.0;
            };
            let (health, dealt) = building.health.damaged(amount);
            building.health = health;
            (dealt, !health.is_alive())
        }
    };

    if dealt > 0.0 {
        out_events.push(Event::DamageApplied {
            source,
            target,
            amount: dealt,
        });
    }

    if dead {
        match target {
            EntityRef::Unit(id) => {
                if let Some(unit) = world.remove_unit(id) {
                    tracing::info!(
                        unit = id.get(),
                        archetype = ?unit.archetype,
                        team = ?unit.team,
                        "unit died"
                    );
                    out_events.push(Event::UnitDied {
                        unit: id,
                        team: unit.team,
                        archetype: unit.archetype,
                    });
                }
            }
            EntityRef::Building(id) => {
                if let Some(building) = world.remove_building(id, out_events) {
                    tracing::info!(
                        building = id.get(),
                        kind = ?building.kind,
                        team = ?building.team,
                        "building destroyed"
                    );
                    out_events.push(Event::BuildingDestroyed {
                        building: id,
                        kind: building.kind,
                        team: building.team,
                        tile: building.tile,
                    });
                }
            }
        }
    }

    dealt
}

impl Battlefield for World {
    fn grid(&self) -> GridView<'_> {
        self.grid.view()
    }

    fn now(&self) -> Duration {
        self.clock
    }

    fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    fn unit(&self, id: UnitId) -> Option<UnitSnapshot> {
        self.units.get(id).map(UnitEntry::snapshot)
    }

    fn building(&self, id: BuildingId) -> Option<BuildingSnapshot> {
        self.buildings.get(id).map(BuildingEntry::snapshot)
    }

    fn resolve(&self, entity: EntityRef) -> Option<TargetSnapshot> {
        self.resolve_target(entity)
    }

    fn hostile_targets(&self, team: Team) -> Vec<TargetSnapshot> {
        self.teams
            .members(team.opponent())
            .filter_map(|entity| self.resolve_target(entity))
            .collect()
    }

    fn units_within(&self, point: Vec2, radius: f32) -> Vec<UnitPresence> {
        if !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }

        let view = self.grid.view();
        let min = view.tile_at(point - Vec2::splat(radius));
        let max = view.tile_at(point + Vec2::splat(radius));
        let span_columns = i64::from(max.column()) - i64::from(min.column()) + 1;
        let span_rows = i64::from(max.row()) - i64::from(min.row()) + 1;
        let area = span_columns.saturating_mul(span_rows);

        let mut candidates = Vec::new();
        if area > i64::try_from(self.buckets.len()).unwrap_or(i64::MAX) {
            candidates.extend(self.units.iter().map(|unit| unit.id));
        } else {
            self.buckets.collect_in(min, max, &mut candidates);
        }
        candidates.sort_unstable();
        candidates.dedup();

        candidates
            .into_iter()
            .filter_map(|id| self.units.get(id))
            .filter(|unit| unit.position.distance(point) <= radius)
            .map(|unit| UnitPresence {
                id: unit.id,
                team: unit.team,
                position: unit.position,
            })
            .collect()
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use auto_battle_core::{
        BuildingId, BuildingKind, BuildingRecord, BuildingSnapshot, GridView, PlayMode,
        ProjectileSnapshot, Team, TileCoord, UnitId, UnitRecord, UnitSnapshot,
    };

    use super::World;

    /// Retrieves the welcome banner that adapters may display.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Read-only view of the tile grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Active play mode.
    #[must_use]
    pub fn play_mode(world: &World) -> PlayMode {
        world.play_mode
    }

    /// Total simulated time elapsed.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.clock
    }

    /// Identifiers of every live unit in ascending order.
    #[must_use]
    pub fn unit_ids(world: &World) -> Vec<UnitId> {
        world.units.iter().map(|unit| unit.id).collect()
    }

    /// Snapshot of a live unit.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<UnitSnapshot> {
        world.units.get(id).map(|unit| unit.snapshot())
    }

    /// Snapshots of every live unit in id order.
    #[must_use]
    pub fn units(world: &World) -> Vec<UnitSnapshot> {
        world.units.iter().map(|unit| unit.snapshot()).collect()
    }

    /// Number of live units fighting for `team`.
    #[must_use]
    pub fn unit_count(world: &World, team: Team) -> usize {
        world.units.iter().filter(|unit| unit.team == team).count()
    }

    /// Snapshot of a live building.
    #[must_use]
    pub fn building(world: &World, id: BuildingId) -> Option<BuildingSnapshot> {
        world.buildings.get(id).map(|building| building.snapshot())
    }

    /// Snapshots of every live building in id order.
    #[must_use]
    pub fn buildings(world: &World) -> Vec<BuildingSnapshot> {
        world
            .buildings
            .iter()
            .map(|building| building.snapshot())
            .collect()
    }

    /// Identifiers of every live defensive building in ascending order.
    #[must_use]
    pub fn defense_ids(world: &World) -> Vec<BuildingId> {
        world
            .buildings
            .iter()
            .filter(|building| building.kind.defense_profile(building.level).is_some())
            .map(|building| building.id)
            .collect()
    }

    /// Reports whether `team` still owns a live building of `kind`.
    #[must_use]
    pub fn has_building(world: &World, team: Team, kind: BuildingKind) -> bool {
        world
            .buildings
            .iter()
            .any(|building| building.team == team && building.kind == kind)
    }

    /// Snapshots of every in-flight projectile in id order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| projectile.snapshot())
            .collect()
    }

    /// Save-data tuples describing the live units of `team`.
    ///
    /// Units standing outside the grid are recorded on their nearest edge tile.
    #[must_use]
    pub fn unit_records(world: &World, team: Team) -> Vec<UnitRecord> {
        let view = world.grid.view();
        let max_column = i32::try_from(view.columns()).unwrap_or(i32::MAX).saturating_sub(1);
        let max_row = i32::try_from(view.rows()).unwrap_or(i32::MAX).saturating_sub(1);
        world
            .units
            .iter()
            .filter(|unit| unit.team == team)
            .map(|unit| {
                let tile = view.tile_at(unit.position);
                UnitRecord {
                    archetype: unit.archetype,
                    tile: TileCoord::new(
                        tile.column().clamp(0, max_column.max(0)),
                        tile.row().clamp(0, max_row.max(0)),
                    ),
                }
            })
            .collect()
    }

    /// Save-data tuples describing the live buildings of `team`.
    #[must_use]
    pub fn building_records(world: &World, team: Team) -> Vec<BuildingRecord> {
        world
            .buildings
            .iter()
            .filter(|building| building.team == team)
            .map(|building| BuildingRecord {
                kind: building.kind,
                tile: building.tile,
                level: building.level,
            })
            .collect()
    }

    /// Searches expanding square rings around `origin` for a walkable tile no
    /// unit currently stands on.
    ///
    /// Rings of radius `1..=max_radius` are scanned column by column; the first
    /// hit wins. Returns `None` once the bounded search is exhausted.
    #[must_use]
    pub fn find_free_tile_near(
        world: &World,
        origin: TileCoord,
        max_radius: u32,
    ) -> Option<TileCoord> {
        let view = world.grid.view();
        let max_radius = i32::try_from(max_radius).unwrap_or(i32::MAX);
        for radius in 1..=max_radius {
            for column in -radius..=radius {
                for row in -radius..=radius {
                    if column.abs() != radius && row.abs() != radius {
                        continue;
                    }

                    let tile = origin.offset(column, row);
                    if view.is_walkable(tile) && !world.buckets.is_occupied(tile) {
                        return Some(tile);
                    }
                }
            }
        }
        None
    }
}
