use std::time::Duration;

use auto_battle_core::{
    Battlefield, BlastProfile, BuildingId, BuildingKind, Command, EntityRef, Event, Health,
    PlayMode, Team, TileCoord, UnitArchetype, UnitId, UnitProfile, UnitState,
};
use auto_battle_simulation::{Outcome, Simulation, SimulationConfig};
use auto_battle_world::query;
use glam::Vec2;

const STEP: Duration = Duration::from_millis(100);

#[test]
fn basic_combat_destroys_building_after_five_attacks() {
    let mut simulation = Simulation::new(SimulationConfig::default());
    let target = place(
        &mut simulation,
        BuildingKind::GoldMine,
        (9, 9),
        Some(Health::new(100.0)),
    );
    let profile = UnitProfile::new(150.0, 150.0, 20.0, 250.0, Duration::from_secs(1));
    let unit = spawn(&mut simulation, UnitArchetype::Barbarian, (0, 0), Some(profile));
    begin_battle(&mut simulation);

    let mut log = Vec::new();
    for _ in 0..400 {
        log.extend(simulation.advance(STEP));
        if query::building(simulation.world(), target).is_none() {
            break;
        }
    }

    assert!(log
        .iter()
        .any(|event| matches!(event, Event::PathAssigned { unit: moving, .. } if *moving == unit)));
    assert!(log.contains(&Event::UnitStateChanged {
        unit,
        from: UnitState::Moving,
        to: UnitState::Attacking,
    }));
    let hits: Vec<f32> = log
        .iter()
        .filter_map(|event| match event {
            Event::DamageApplied { target: hit, amount, .. }
                if *hit == EntityRef::Building(target) =>
            {
                Some(*amount)
            }
            _ => None,
        })
        .collect();
    assert_eq!(hits, vec![20.0; 5]);
    assert!(log.iter().any(|event| matches!(
        event,
        Event::BuildingDestroyed { building, .. } if *building == target
    )));
    assert_eq!(simulation.outcome(), Some(Outcome::Victory));
}

#[test]
fn dynamic_replanning_avoids_newly_blocked_tile() {
    let mut simulation = Simulation::default();
    let _ = place(&mut simulation, BuildingKind::GoldMine, (9, 5), None);
    let _ = place(&mut simulation, BuildingKind::Headquarters, (9, 0), None);
    let unit = spawn(&mut simulation, UnitArchetype::Barbarian, (0, 5), None);
    begin_battle(&mut simulation);
    for _ in 0..2 {
        let _ = simulation.advance(STEP);
    }

    let blocked = TileCoord::new(5, 5);
    let events = simulation.apply(Command::SetTileBlocked {
        tile: blocked,
        blocked: true,
    });
    assert_eq!(events, vec![Event::TileChanged { tile: blocked, blocked: true }]);

    let mut replans = Vec::new();
    for _ in 0..200 {
        for event in simulation.advance(STEP) {
            if let Event::PathAssigned { waypoints, .. } = event {
                replans.push(waypoints);
            }
        }
        let state = query::unit(simulation.world(), unit).map(|snapshot| snapshot.state);
        if state == Some(UnitState::Attacking) {
            break;
        }
    }

    assert!(!replans.is_empty(), "unit never requested a new path");
    let grid = simulation.world().grid();
    for waypoints in &replans {
        let tiles: Vec<TileCoord> = waypoints.iter().map(|point| grid.tile_at(*point)).collect();
        for pair in tiles.windows(2) {
            let mut cursor = pair[0];
            while cursor != pair[1] {
                cursor = TileCoord::new(
                    cursor.column() + (pair[1].column() - cursor.column()).signum(),
                    cursor.row() + (pair[1].row() - cursor.row()).signum(),
                );
                assert_ne!(cursor, blocked, "replanned route crosses the blocked tile");
            }
        }
    }
    assert_eq!(
        query::unit(simulation.world(), unit).map(|snapshot| snapshot.state),
        Some(UnitState::Attacking)
    );
}

#[test]
fn demolition_unit_hits_every_building_once_and_vanishes() {
    let mut simulation = Simulation::default();
    let wall = place(&mut simulation, BuildingKind::Wall, (6, 5), None);
    let mine = place(&mut simulation, BuildingKind::GoldMine, (5, 7), None);
    let hall = place(&mut simulation, BuildingKind::Headquarters, (3, 5), None);
    let sturdy = UnitProfile::new(10_000.0, 100.0, 0.0, 350.0, Duration::ZERO)
        .with_blast(BlastProfile::new(300.0, 200.0));
    let bomber = spawn(&mut simulation, UnitArchetype::Bomber, (5, 5), Some(sturdy));
    begin_battle(&mut simulation);

    let mut log = Vec::new();
    for _ in 0..5 {
        log.extend(simulation.advance(STEP));
    }

    let detonation = log.iter().find_map(|event| match event {
        Event::Detonated { unit, damaged, .. } if *unit == bomber => Some(damaged.clone()),
        _ => None,
    });
    assert_eq!(detonation, Some(vec![wall, mine, hall]));
    for building in [wall, mine, hall] {
        let hits = log
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::DamageApplied { target, amount, .. }
                        if *target == EntityRef::Building(building) && *amount == 200.0
                )
            })
            .count();
        assert_eq!(hits, 1, "building {} hit {hits} times", building.get());
    }

    assert!(query::building(simulation.world(), wall).is_none());
    assert!(log.contains(&Event::TileChanged {
        tile: TileCoord::new(6, 5),
        blocked: false,
    }));
    assert!(simulation.world().grid().is_walkable(TileCoord::new(6, 5)));
    assert_eq!(
        query::building(simulation.world(), mine).map(|building| building.health),
        Some(Health::new(400.0))
    );
    assert!(query::unit(simulation.world(), bomber).is_none());
    assert!(log.contains(&Event::UnitDespawned { unit: bomber }));
    assert_eq!(simulation.outcome(), Some(Outcome::Defeat));
}

#[test]
fn distant_bomber_detonates_and_battle_ends() {
    let mut simulation = Simulation::new(SimulationConfig::default());
    let headquarters = place(&mut simulation, BuildingKind::Headquarters, (9, 0), None);
    let wall = place(&mut simulation, BuildingKind::Wall, (6, 5), None);
    let bomber = spawn(&mut simulation, UnitArchetype::Bomber, (0, 5), None);
    begin_battle(&mut simulation);

    let mut log = Vec::new();
    for _ in 0..300 {
        log.extend(simulation.advance(STEP));
        if simulation.outcome().is_some() {
            break;
        }
    }

    assert!(log
        .iter()
        .any(|event| matches!(event, Event::Detonated { unit, .. } if *unit == bomber)));
    assert!(query::building(simulation.world(), wall).is_none());
    assert!(query::building(simulation.world(), headquarters).is_some());
    assert_eq!(simulation.outcome(), Some(Outcome::Defeat));
}

#[test]
fn every_mobile_archetype_reaches_attacking() {
    for archetype in [
        UnitArchetype::Barbarian,
        UnitArchetype::Archer,
        UnitArchetype::Giant,
    ] {
        let mut simulation = Simulation::default();
        let _ = place(&mut simulation, BuildingKind::Barracks, (8, 7), None);
        let unit = spawn(&mut simulation, archetype, (1, 1), None);
        begin_battle(&mut simulation);

        let mut reached = false;
        for _ in 0..200 {
            let _ = simulation.advance(STEP);
            if query::unit(simulation.world(), unit).map(|snapshot| snapshot.state)
                == Some(UnitState::Attacking)
            {
                reached = true;
                break;
            }
        }
        assert!(reached, "{archetype:?} never started attacking");
    }
}

#[test]
fn repeated_blocking_notifies_once() {
    let mut simulation = Simulation::default();
    let tile = TileCoord::new(3, 3);

    let first = simulation.apply(Command::SetTileBlocked { tile, blocked: true });
    let second = simulation.apply(Command::SetTileBlocked { tile, blocked: true });

    assert_eq!(first, vec![Event::TileChanged { tile, blocked: true }]);
    assert!(second.is_empty());
}

#[test]
fn defense_kills_lone_attacker_for_defeat() {
    let mut simulation = Simulation::default();
    let tower = place(&mut simulation, BuildingKind::Defense, (9, 9), None);
    let _hall = place(&mut simulation, BuildingKind::Headquarters, (9, 8), None);
    let unit = spawn(&mut simulation, UnitArchetype::Barbarian, (0, 0), None);
    begin_battle(&mut simulation);

    let mut log = Vec::new();
    for _ in 0..400 {
        log.extend(simulation.advance(STEP));
        if simulation.outcome().is_some() {
            break;
        }
    }

    assert_eq!(simulation.outcome(), Some(Outcome::Defeat));
    assert!(log.contains(&Event::UnitDied {
        unit,
        team: Team::Player,
        archetype: UnitArchetype::Barbarian,
    }));
    assert!(log.iter().any(|event| matches!(
        event,
        Event::DamageApplied { source: Some(source), .. } if *source == EntityRef::Building(tower)
    )));

    let quiet = simulation.advance(STEP);
    assert_eq!(quiet, vec![Event::TimeAdvanced { dt: STEP }]);
}

#[test]
fn destroying_headquarters_wins() {
    let mut simulation = Simulation::default();
    let _ = place(
        &mut simulation,
        BuildingKind::Headquarters,
        (2, 0),
        Some(Health::new(30.0)),
    );
    let _ = spawn(&mut simulation, UnitArchetype::Barbarian, (0, 0), None);
    begin_battle(&mut simulation);

    for _ in 0..100 {
        let _ = simulation.advance(STEP);
        if simulation.outcome().is_some() {
            break;
        }
    }

    assert_eq!(simulation.outcome(), Some(Outcome::Victory));
}

#[test]
fn units_hold_still_during_preparation() {
    let mut simulation = Simulation::default();
    let _ = place(&mut simulation, BuildingKind::GoldMine, (5, 5), None);
    let unit = spawn(&mut simulation, UnitArchetype::Barbarian, (0, 0), None);

    for _ in 0..10 {
        let events = simulation.advance(STEP);
        assert_eq!(events, vec![Event::TimeAdvanced { dt: STEP }]);
    }

    assert_eq!(
        query::unit(simulation.world(), unit).map(|snapshot| snapshot.position),
        Some(Vec2::new(50.0, 50.0))
    );
    assert_eq!(query::play_mode(simulation.world()), PlayMode::Preparation);
}

fn begin_battle(simulation: &mut Simulation) {
    let _ = simulation.apply(Command::SetPlayMode {
        mode: PlayMode::Battle,
    });
}

fn place(
    simulation: &mut Simulation,
    kind: BuildingKind,
    tile: (i32, i32),
    health: Option<Health>,
) -> BuildingId {
    simulation
        .apply(Command::PlaceBuilding {
            kind,
            team: Team::Enemy,
            tile: TileCoord::new(tile.0, tile.1),
            level: 1,
            health,
        })
        .into_iter()
        .find_map(|event| match event {
            Event::BuildingPlaced { building, .. } => Some(building),
            _ => None,
        })
        .expect("placement succeeds")
}

fn spawn(
    simulation: &mut Simulation,
    archetype: UnitArchetype,
    tile: (i32, i32),
    profile: Option<UnitProfile>,
) -> UnitId {
    simulation
        .apply(Command::SpawnUnit {
            archetype,
            team: Team::Player,
            tile: TileCoord::new(tile.0, tile.1),
            profile,
        })
        .into_iter()
        .find_map(|event| match event {
            Event::UnitSpawned { unit, .. } => Some(unit),
            _ => None,
        })
        .expect("spawn succeeds")
}
