#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless auto-battle.

mod ascii;
mod config;
mod layout_transfer;
mod obstacles;

use std::{collections::BTreeSet, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use auto_battle_core::{Battlefield, Command, EntityRef, Event, PlayMode, Team, TileCoord};
use auto_battle_simulation::{Outcome, Simulation};
use auto_battle_world::query;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{config::ScenarioConfig, layout_transfer::LayoutSnapshot};

/// Runs one battle between an attacking army and a defended base.
#[derive(Parser, Debug)]
#[command(name = "auto-battle", version)]
struct Args {
    /// TOML scenario describing the grid, tuning and both sides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Layout string replacing the scenario's grid and composition.
    #[arg(long)]
    layout: Option<String>,

    /// Battle time budget in seconds.
    #[arg(long, default_value_t = 120)]
    seconds: u64,

    /// Simulation step length in milliseconds.
    #[arg(long, default_value_t = 100)]
    step_ms: u64,

    /// Number of random obstacle tiles scattered before the battle.
    #[arg(long, default_value_t = 0)]
    obstacles: usize,

    /// Seed for the obstacle scatter.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print the map before and after the battle.
    #[arg(long)]
    draw: bool,

    /// Print the scenario as a layout string and exit.
    #[arg(long)]
    export_layout: bool,
}

#[derive(Debug, Default)]
struct Tally {
    damage_to_units: f32,
    damage_to_buildings: f32,
    units_lost: usize,
    buildings_destroyed: usize,
    detonations: usize,
    rejections: usize,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::DamageApplied {
                    target: EntityRef::Unit(_),
                    amount,
                    ..
                } => self.damage_to_units += amount,
                Event::DamageApplied {
                    target: EntityRef::Building(_),
                    amount,
                    ..
                } => self.damage_to_buildings += amount,
                Event::UnitDied { .. } | Event::UnitDespawned { .. } => self.units_lost += 1,
                Event::BuildingDestroyed { .. } => self.buildings_destroyed += 1,
                Event::Detonated { .. } => self.detonations += 1,
                Event::SpawnRejected { .. } | Event::PlacementRejected { .. } => {
                    self.rejections += 1;
                }
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auto_battle=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut scenario = match &args.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(layout) = &args.layout {
        let layout = LayoutSnapshot::decode(layout).context("invalid --layout string")?;
        scenario.adopt(layout);
    }

    if args.export_layout {
        println!("{}", scenario.snapshot().encode()?);
        return Ok(());
    }
    if args.step_ms == 0 {
        anyhow::bail!("--step-ms must be positive");
    }

    let mut simulation = Simulation::new(scenario.simulation);
    println!("{}", query::welcome_banner(simulation.world()));

    let mut tally = Tally::default();
    deploy(&mut simulation, &scenario, &mut tally);
    scatter(&mut simulation, args.obstacles, args.seed);

    if args.draw {
        print!("{}", ascii::draw(simulation.world()));
    }

    tally.record(&simulation.apply(Command::SetPlayMode {
        mode: PlayMode::Battle,
    }));

    let step = Duration::from_millis(args.step_ms);
    let budget = Duration::from_secs(args.seconds);
    while simulation.outcome().is_none() && simulation.world().now() < budget {
        tally.record(&simulation.advance(step));
    }

    if args.draw {
        print!("{}", ascii::draw(simulation.world()));
    }
    report(&simulation, &tally);
    Ok(())
}

fn deploy(simulation: &mut Simulation, scenario: &ScenarioConfig, tally: &mut Tally) {
    for record in &scenario.buildings {
        tally.record(&simulation.apply(Command::PlaceBuilding {
            kind: record.kind,
            team: Team::Enemy,
            tile: record.tile,
            level: record.level,
            health: None,
        }));
    }
    for record in &scenario.units {
        tally.record(&simulation.apply(Command::SpawnUnit {
            archetype: record.archetype,
            team: Team::Player,
            tile: record.tile,
            profile: None,
        }));
    }
}

fn scatter(simulation: &mut Simulation, count: usize, seed: u64) {
    if count == 0 {
        return;
    }

    let world = simulation.world();
    let grid = world.grid();
    let reserved: BTreeSet<TileCoord> = query::units(world)
        .iter()
        .map(|unit| grid.tile_at(unit.position))
        .collect();
    let picked = obstacles::pick(grid, &reserved, count, seed);

    tracing::info!(requested = count, placed = picked.len(), seed, "scattering obstacles");
    for tile in picked {
        let _ = simulation.apply(Command::SetTileBlocked {
            tile,
            blocked: true,
        });
    }
}

fn report(simulation: &Simulation, tally: &Tally) {
    let world = simulation.world();
    let outcome = match simulation.outcome() {
        Some(Outcome::Victory) => "victory",
        Some(Outcome::Defeat) => "defeat",
        None => "undecided",
    };

    println!("outcome: {outcome}");
    println!("elapsed: {:.1}s", world.now().as_secs_f32());
    println!(
        "attackers remaining: {}",
        query::unit_count(world, Team::Player)
    );
    println!(
        "buildings remaining: {}",
        query::buildings(world).len()
    );
    println!("units lost: {}", tally.units_lost);
    println!("buildings destroyed: {}", tally.buildings_destroyed);
    println!("detonations: {}", tally.detonations);
    println!("damage to units: {:.0}", tally.damage_to_units);
    println!("damage to buildings: {:.0}", tally.damage_to_buildings);
    if tally.rejections > 0 {
        println!("rejected deployments: {}", tally.rejections);
    }
}
