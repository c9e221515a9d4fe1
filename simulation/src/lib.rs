#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-order scheduler that drives the world and its combat systems.

use std::time::Duration;

use auto_battle_core::{BuildingKind, Command, Event, PlayMode, Team};
use auto_battle_system_defense::Defense;
use auto_battle_system_unit_ai::{UnitAi, UnitAiTuning};
use auto_battle_world::{self as world, query, World};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Parameters used to build a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Edge length of a tile in world units.
    pub cell_size: f32,
    /// World position of the grid's minimum corner.
    pub origin: Vec2,
    /// Unit controller constants.
    pub tuning: UnitAiTuning,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            columns: 10,
            rows: 10,
            cell_size: 100.0,
            origin: Vec2::ZERO,
            tuning: UnitAiTuning::default(),
        }
    }
}

/// Final verdict of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// No enemy headquarters remains.
    Victory,
    /// No player unit remains.
    Defeat,
}

/// Owns the world and runs every system once per step.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    unit_ai: UnitAi,
    defense: Defense,
    outcome: Option<Outcome>,
}

impl Simulation {
    /// Creates a simulation whose grid follows `config`.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let mut simulation = Self {
            world: World::new(),
            unit_ai: UnitAi::new(config.tuning),
            defense: Defense::new(),
            outcome: None,
        };
        let _ = simulation.apply(Command::ConfigureGrid {
            columns: config.columns,
            rows: config.rows,
            cell_size: config.cell_size,
            origin: config.origin,
        });
        simulation
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Latched battle verdict, if one has been reached.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Applies an external command and returns the events it produced.
    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        self.dispatch(command, &mut events);
        self.settle(&events);
        events
    }

    /// Advances the battle by `dt` and returns every event produced.
    ///
    /// Order within a step is fixed: the world clock ticks, then each live unit
    /// decides in ascending id order with its commands applied before the next
    /// unit decides, then each defense decides, then the verdict is updated.
    /// Once a verdict is latched the systems stop acting.
    pub fn advance(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        self.dispatch(Command::Tick { dt }, &mut events);

        if self.outcome.is_none() {
            let mut commands = Vec::new();
            for unit in query::unit_ids(&self.world) {
                self.unit_ai.decide(&self.world, unit, dt, &mut commands);
                for command in commands.drain(..) {
                    self.dispatch(command, &mut events);
                }
            }

            for defense in query::defense_ids(&self.world) {
                self.defense.handle(&self.world, defense, &mut commands);
                for command in commands.drain(..) {
                    self.dispatch(command, &mut events);
                }
            }
        }

        self.settle(&events);
        events
    }

    fn dispatch(&mut self, command: Command, events: &mut Vec<Event>) {
        let start = events.len();
        world::apply(&mut self.world, command, events);
        self.unit_ai.handle(&events[start..]);
    }

    fn settle(&mut self, events: &[Event]) {
        if self.outcome.is_some() || query::play_mode(&self.world) != PlayMode::Battle {
            return;
        }

        let casualties = events.iter().any(|event| {
            matches!(
                event,
                Event::UnitDied { .. }
                    | Event::UnitDespawned { .. }
                    | Event::BuildingDestroyed { .. }
            )
        });
        if !casualties {
            return;
        }

        let verdict = if !query::has_building(&self.world, Team::Enemy, BuildingKind::Headquarters)
        {
            Some(Outcome::Victory)
        } else if query::unit_count(&self.world, Team::Player) == 0 {
            Some(Outcome::Defeat)
        } else {
            None
        };

        if let Some(verdict) = verdict {
            tracing::info!(?verdict, elapsed = ?query::now(&self.world), "battle decided");
            self.outcome = Some(verdict);
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
