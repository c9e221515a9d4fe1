#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-unit combat state machine that pursues and attacks hostile entities.
//!
//! The controller never mutates the battlefield. Each call to
//! [`UnitAi::decide`] observes one unit through the [`Battlefield`] seam and
//! pushes the commands that carry out its decision for the tick.

mod policy;

use std::{collections::BTreeMap, time::Duration};

use auto_battle_core::{
    Battlefield, Command, EntityRef, Event, GridView, PlayMode, TargetSnapshot, TileCoord, UnitId,
    UnitSnapshot, UnitState,
};
use auto_battle_system_pathfinding::{is_route_walkable, Connectivity, Pathfinder};
use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use policy::{AttackStyle, Policy, TargetSearch};

/// Tunable constants governing movement and target search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitAiTuning {
    /// Distance below which a waypoint counts as reached.
    pub arrival_tolerance: f32,
    /// A fresh route whose first waypoint lies closer than this is entered at
    /// its second waypoint.
    pub underfoot_radius: f32,
    /// Delay before a unit retries after a failed search or path request.
    pub search_interval_ms: u64,
    /// Radius inside which neighbours push a moving unit away.
    pub separation_radius: f32,
    /// Push applied per neighbour, in world units per second.
    pub separation_strength: f32,
    /// Whether strike units switch to hostile units they bump into en route.
    pub retarget_on_contact: bool,
    /// Radius that counts as contact for `retarget_on_contact`.
    pub contact_radius: f32,
    /// Neighbourhood used by the pathfinder.
    pub connectivity: Connectivity,
}

impl UnitAiTuning {
    /// Retry delay as a duration.
    #[must_use]
    pub fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search_interval_ms)
    }
}

impl Default for UnitAiTuning {
    fn default() -> Self {
        Self {
            arrival_tolerance: 10.0,
            underfoot_radius: 50.0,
            search_interval_ms: 1_000,
            separation_radius: 50.0,
            separation_strength: 10.0,
            retarget_on_contact: false,
            contact_radius: 60.0,
            connectivity: Connectivity::Four,
        }
    }
}

/// Unit controller shared by every mobile unit on the battlefield.
#[derive(Debug)]
pub struct UnitAi {
    tuning: UnitAiTuning,
    pathfinder: Pathfinder,
    retry_at: BTreeMap<UnitId, Duration>,
    obstruction_revision: u64,
    checked_revision: BTreeMap<UnitId, u64>,
}

impl UnitAi {
    /// Creates a controller using the provided tuning.
    #[must_use]
    pub fn new(tuning: UnitAiTuning) -> Self {
        Self {
            tuning,
            pathfinder: Pathfinder::new(tuning.connectivity),
            retry_at: BTreeMap::new(),
            obstruction_revision: 0,
            checked_revision: BTreeMap::new(),
        }
    }

    /// Tuning the controller was created with.
    #[must_use]
    pub fn tuning(&self) -> &UnitAiTuning {
        &self.tuning
    }

    /// Consumes world events to keep per-unit bookkeeping current.
    ///
    /// Newly blocked tiles make every moving unit revalidate its route on its
    /// next decision.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::UnitDied { unit, .. } | Event::UnitDespawned { unit } => {
                    let _ = self.retry_at.remove(unit);
                    let _ = self.checked_revision.remove(unit);
                }
                Event::GridConfigured { .. } => {
                    self.retry_at.clear();
                    self.checked_revision.clear();
                }
                Event::TileChanged { blocked: true, .. } => {
                    self.obstruction_revision = self.obstruction_revision.wrapping_add(1);
                }
                _ => {}
            }
        }
    }

    /// Runs one unit's decision for the current tick.
    ///
    /// Units only act during battle. `dt` is the length of the tick that just
    /// elapsed and scales movement and separation.
    pub fn decide<B>(&mut self, field: &B, unit: UnitId, dt: Duration, out: &mut Vec<Command>)
    where
        B: Battlefield + ?Sized,
    {
        if field.play_mode() != PlayMode::Battle {
            return;
        }
        let Some(unit) = field.unit(unit) else {
            return;
        };

        let policy = Policy::for_archetype(unit.archetype);
        let now = field.now();

        let mut held = unit
            .target
            .and_then(|entity| field.resolve(entity))
            .filter(|target| target.health.is_alive());
        if unit.target.is_some() && held.is_none() {
            tracing::debug!(unit = unit.id.get(), "held target is gone");
            out.push(Command::SetUnitTarget {
                unit: unit.id,
                target: None,
            });
        }

        if self.tuning.retarget_on_contact
            && unit.state == UnitState::Moving
            && policy.attack() == AttackStyle::Strike
        {
            if let Some(contact) = self.contact(field, &unit) {
                if held.map(|target| target.entity) != Some(contact.entity) {
                    tracing::debug!(
                        unit = unit.id.get(),
                        target = ?contact.entity,
                        "retargeting on contact"
                    );
                    out.push(Command::SetUnitTarget {
                        unit: unit.id,
                        target: Some(contact.entity),
                    });
                    held = Some(contact);
                }
            }
        }

        let position = match unit.state {
            UnitState::Idle => {
                self.idle(field, &unit, policy, held, now, out);
                None
            }
            UnitState::Moving => Some(self.moving(field, &unit, held, dt, now, out)),
            UnitState::Attacking => self.attacking(field, &unit, policy, held, now, out),
        };

        if let Some(position) = position {
            self.separate(field, &unit, position, dt, out);
        }
    }

    fn idle<B>(
        &mut self,
        field: &B,
        unit: &UnitSnapshot,
        policy: Policy,
        held: Option<TargetSnapshot>,
        now: Duration,
        out: &mut Vec<Command>,
    ) where
        B: Battlefield + ?Sized,
    {
        if !self.may_retry(unit.id, now) {
            return;
        }

        let target = match held {
            Some(target) => target,
            None => {
                let Some(found) = policy.find_target(field, unit) else {
                    self.postpone(unit.id, now);
                    return;
                };
                tracing::debug!(unit = unit.id.get(), target = ?found.entity, "target acquired");
                out.push(Command::SetUnitTarget {
                    unit: unit.id,
                    target: Some(found.entity),
                });
                found
            }
        };

        if in_range(unit, unit.position, &target) {
            transition(unit, UnitState::Attacking, out);
            return;
        }

        if self.reroute(field, unit, &target, unit.position, now, out) {
            transition(unit, UnitState::Moving, out);
        }
    }

    fn moving<B>(
        &mut self,
        field: &B,
        unit: &UnitSnapshot,
        held: Option<TargetSnapshot>,
        dt: Duration,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Vec2
    where
        B: Battlefield + ?Sized,
    {
        let Some(target) = held else {
            transition(unit, UnitState::Idle, out);
            return unit.position;
        };

        if in_range(unit, unit.position, &target) {
            transition(unit, UnitState::Attacking, out);
            return unit.position;
        }

        if unit.next_waypoint().is_none() {
            if !self.reroute(field, unit, &target, unit.position, now, out) {
                transition(unit, UnitState::Idle, out);
            }
            return unit.position;
        }

        let (position, cursor, arrived) = self.follow(unit, dt);
        out.push(Command::MoveUnit {
            unit: unit.id,
            position,
            path_cursor: cursor,
        });

        if in_range(unit, position, &target) {
            transition(unit, UnitState::Attacking, out);
            return position;
        }

        let obstruction_seen = self
            .checked_revision
            .insert(unit.id, self.obstruction_revision)
            .map_or(self.obstruction_revision != 0, |checked| {
                checked != self.obstruction_revision
            });
        if arrived || obstruction_seen {
            let grid = field.grid();
            let mut remaining = Vec::with_capacity(unit.waypoints.len() + 1);
            remaining.push(position);
            remaining.extend(unit.waypoints.iter().skip(cursor).copied());
            if !is_route_walkable(&grid, &remaining) {
                tracing::debug!(unit = unit.id.get(), "route obstructed, replanning");
                if !self.reroute(field, unit, &target, position, now, out) {
                    transition(unit, UnitState::Idle, out);
                }
            }
        }

        position
    }

    fn attacking<B>(
        &mut self,
        field: &B,
        unit: &UnitSnapshot,
        policy: Policy,
        held: Option<TargetSnapshot>,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Option<Vec2>
    where
        B: Battlefield + ?Sized,
    {
        let Some(target) = held else {
            transition(unit, UnitState::Idle, out);
            return Some(unit.position);
        };

        if !in_range(unit, unit.position, &target) {
            if self.reroute(field, unit, &target, unit.position, now, out) {
                transition(unit, UnitState::Moving, out);
            } else {
                transition(unit, UnitState::Idle, out);
            }
            return Some(unit.position);
        }

        if policy.attack() == AttackStyle::Detonate {
            out.push(policy.attack_command(unit, &target));
            return None;
        }

        if unit.attack_ready(now) {
            out.push(policy.attack_command(unit, &target));
        }
        Some(unit.position)
    }

    /// Walks the active path for one tick, returning the new position, the
    /// updated cursor and whether any waypoint was reached.
    ///
    /// Intermediate waypoints count as reached within the arrival tolerance.
    /// The final waypoint is only reached by standing on it.
    fn follow(&self, unit: &UnitSnapshot, dt: Duration) -> (Vec2, usize, bool) {
        let mut position = unit.position;
        let mut cursor = unit.path_cursor;
        let mut budget = unit.profile.move_speed() * dt.as_secs_f32();
        let mut arrived = false;

        while let Some(waypoint) = unit.waypoints.get(cursor).copied() {
            let last = cursor + 1 == unit.waypoints.len();
            let offset = waypoint - position;
            let distance = offset.length();
            if distance == 0.0 || (!last && distance <= self.tuning.arrival_tolerance) {
                cursor += 1;
                arrived = true;
                continue;
            }
            if budget <= 0.0 {
                break;
            }

            if budget >= distance {
                position = waypoint;
                budget -= distance;
            } else {
                position += offset / distance * budget;
                budget = 0.0;
            }
        }

        (position, cursor, arrived)
    }

    /// Requests a fresh route toward `target` and assigns it.
    ///
    /// Returns `false` without assigning anything when no useful route
    /// exists; the unit then waits one search interval before trying again.
    fn reroute<B>(
        &mut self,
        field: &B,
        unit: &UnitSnapshot,
        target: &TargetSnapshot,
        from: Vec2,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> bool
    where
        B: Battlefield + ?Sized,
    {
        let grid = field.grid();
        let waypoints = approach_tile(&grid, unit, target, from)
            .map(|goal| {
                self.pathfinder
                    .find_path(&grid, from, grid.tile_to_world(goal))
            })
            .unwrap_or_default();

        let stalled = match waypoints.as_slice() {
            [] => true,
            [only] => *only == from,
            _ => false,
        };
        if stalled {
            tracing::warn!(
                unit = unit.id.get(),
                target = ?target.entity,
                "no route toward target"
            );
            self.postpone(unit.id, now);
            return false;
        }

        let mut waypoints = waypoints;
        if waypoints.len() > 1 && waypoints[0].distance(from) < self.tuning.underfoot_radius {
            let _ = waypoints.remove(0);
        }
        tracing::debug!(
            unit = unit.id.get(),
            waypoints = waypoints.len(),
            "path assigned"
        );
        let _ = self.checked_revision.insert(unit.id, self.obstruction_revision);
        out.push(Command::AssignPath {
            unit: unit.id,
            waypoints,
        });
        true
    }

    fn separate<B>(
        &self,
        field: &B,
        unit: &UnitSnapshot,
        position: Vec2,
        dt: Duration,
        out: &mut Vec<Command>,
    ) where
        B: Battlefield + ?Sized,
    {
        if unit.state == UnitState::Idle || self.tuning.separation_radius <= 0.0 {
            return;
        }

        let push: Vec2 = field
            .units_within(position, self.tuning.separation_radius)
            .into_iter()
            .filter(|neighbour| neighbour.id != unit.id)
            .map(|neighbour| (position - neighbour.position).normalize_or_zero())
            .sum();
        if push == Vec2::ZERO {
            return;
        }

        out.push(Command::NudgeUnit {
            unit: unit.id,
            offset: push * self.tuning.separation_strength * dt.as_secs_f32(),
        });
    }

    fn contact<B>(&self, field: &B, unit: &UnitSnapshot) -> Option<TargetSnapshot>
    where
        B: Battlefield + ?Sized,
    {
        let touching = field
            .units_within(unit.position, self.tuning.contact_radius)
            .into_iter()
            .filter(|presence| presence.team != unit.team)
            .filter_map(|presence| field.resolve(EntityRef::Unit(presence.id)))
            .filter(|target| target.health.is_alive());
        policy::nearest(unit.position, touching)
    }

    fn may_retry(&self, unit: UnitId, now: Duration) -> bool {
        self.retry_at.get(&unit).map_or(true, |ready| now >= *ready)
    }

    fn postpone(&mut self, unit: UnitId, now: Duration) {
        let _ = self
            .retry_at
            .insert(unit, now.saturating_add(self.tuning.search_interval()));
    }
}

impl Default for UnitAi {
    fn default() -> Self {
        Self::new(UnitAiTuning::default())
    }
}

fn transition(unit: &UnitSnapshot, state: UnitState, out: &mut Vec<Command>) {
    out.push(Command::SetUnitState {
        unit: unit.id,
        state,
    });
}

fn in_range(unit: &UnitSnapshot, position: Vec2, target: &TargetSnapshot) -> bool {
    position.distance(target.position) <= unit.profile.attack_range()
}

/// Tile the unit should walk to in order to engage `target`.
///
/// Walkable targets are approached directly. Otherwise the walkable neighbour
/// of the target's tile that puts it within attack range and lies closest to
/// the unit wins, falling back to the closest walkable neighbour.
fn approach_tile(
    grid: &GridView<'_>,
    unit: &UnitSnapshot,
    target: &TargetSnapshot,
    from: Vec2,
) -> Option<TileCoord> {
    let tile = target
        .tile
        .or_else(|| grid.world_to_tile(target.position))?;
    if grid.is_walkable(tile) {
        return Some(tile);
    }

    let mut best: Option<(bool, f32, TileCoord)> = None;
    for (columns, rows) in APPROACH_OFFSETS {
        let candidate = tile.offset(columns, rows);
        if !grid.is_walkable(candidate) {
            continue;
        }

        let centre = grid.tile_to_world(candidate);
        let reaches = centre.distance(target.position) <= unit.profile.attack_range();
        let distance = centre.distance(from);
        let better = match best {
            None => true,
            Some((best_reaches, best_distance, _)) => {
                (reaches && !best_reaches) || (reaches == best_reaches && distance < best_distance)
            }
        };
        if better {
            best = Some((reaches, distance, candidate));
        }
    }

    best.map(|(_, _, candidate)| candidate)
}

const APPROACH_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (-1, 0),
    (1, 0),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];
