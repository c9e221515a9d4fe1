use auto_battle_core::{Battlefield, BuildingKind, Command, Event, Team, TileCoord};
use auto_battle_system_pathfinding::{is_route_walkable, Connectivity, Pathfinder};
use auto_battle_world::{self as world, query, World};
use glam::Vec2;

#[test]
fn blocking_a_crossed_tile_forces_a_detour() {
    let mut world = World::new();
    let pathfinder = Pathfinder::new(Connectivity::Four);
    let start = TileCoord::new(0, 5);
    let goal = TileCoord::new(9, 5);

    let before = pathfinder.find_tile_path(&world.grid(), start, goal);
    assert!(
        before.contains(&TileCoord::new(5, 5)),
        "straight route should cross the centre tile"
    );
    let waypoints: Vec<Vec2> = pathfinder.find_path(
        &world.grid(),
        world.grid().tile_to_world(start),
        world.grid().tile_to_world(goal),
    );

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetTileBlocked {
            tile: TileCoord::new(5, 5),
            blocked: true,
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::TileChanged {
            tile: TileCoord::new(5, 5),
            blocked: true,
        }]
    );

    assert!(!is_route_walkable(&world.grid(), &waypoints));
    let after = pathfinder.find_tile_path(&world.grid(), start, goal);
    assert!(!after.is_empty());
    assert!(!after.contains(&TileCoord::new(5, 5)));
    assert_eq!(after.len(), before.len() + 2);
}

#[test]
fn placed_buildings_are_obstacles_and_destroyed_ones_are_not() {
    let mut world = World::new();
    let mut events = Vec::new();
    for row in 0..9 {
        world::apply(
            &mut world,
            Command::PlaceBuilding {
                kind: BuildingKind::Wall,
                team: Team::Enemy,
                tile: TileCoord::new(4, row),
                level: 1,
                health: None,
            },
            &mut events,
        );
    }

    let pathfinder = Pathfinder::default();
    let start = TileCoord::new(0, 0);
    let goal = TileCoord::new(9, 0);
    let detour = pathfinder.find_tile_path(&world.grid(), start, goal);
    assert!(detour.contains(&TileCoord::new(4, 9)));

    let gate = query::buildings(&world)
        .into_iter()
        .find(|building| building.tile == TileCoord::new(4, 0))
        .expect("wall at gate");
    world::apply(
        &mut world,
        Command::ApplyDamage {
            target: auto_battle_core::EntityRef::Building(gate.id),
            amount: 10_000.0,
            source: None,
        },
        &mut events,
    );

    let direct = pathfinder.find_tile_path(&world.grid(), start, goal);
    assert_eq!(direct.len(), 10);
}

#[test]
fn walled_off_goal_has_no_route() {
    let mut world = World::new();
    let mut events = Vec::new();
    for (column, row) in [(8, 8), (9, 8), (8, 9)] {
        world::apply(
            &mut world,
            Command::SetTileBlocked {
                tile: TileCoord::new(column, row),
                blocked: true,
            },
            &mut events,
        );
    }

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let path = Pathfinder::new(connectivity).find_path(
            &world.grid(),
            Vec2::new(50.0, 50.0),
            Vec2::new(950.0, 950.0),
        );
        assert!(path.is_empty(), "{connectivity:?} reached the sealed corner");
    }
}

#[test]
fn raising_tile_costs_reroutes_around_the_band() {
    let mut world = World::new();
    let pathfinder = Pathfinder::new(Connectivity::Four);
    let start = TileCoord::new(0, 5);
    let goal = TileCoord::new(9, 5);
    assert!(pathfinder
        .find_tile_path(&world.grid(), start, goal)
        .contains(&TileCoord::new(5, 5)));

    let mut events = Vec::new();
    for row in 3..=7 {
        world::apply(
            &mut world,
            Command::SetTileCost {
                tile: TileCoord::new(5, row),
                cost: 10.0,
            },
            &mut events,
        );
    }
    world::apply(
        &mut world,
        Command::SetTileCost {
            tile: TileCoord::new(40, 40),
            cost: 10.0,
        },
        &mut events,
    );

    assert!(events.is_empty(), "cost changes do not alter obstruction");
    assert_eq!(query::grid_view(&world).cost(TileCoord::new(5, 5)), Some(10.0));
    assert_eq!(query::grid_view(&world).cost(TileCoord::new(5, 2)), Some(1.0));
    let after = pathfinder.find_tile_path(&world.grid(), start, goal);
    assert!(!after.is_empty());
    assert!(after
        .iter()
        .all(|tile| tile.column() != 5 || !(3..=7).contains(&tile.row())));
    assert_eq!(after.len(), 16, "detour adds three rows up and three back");
}
