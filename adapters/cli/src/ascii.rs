use std::fmt::Write as _;

use auto_battle_core::{BuildingKind, TileCoord, UnitArchetype};
use auto_battle_world::{query, World};

/// Renders the battlefield as one character per tile.
///
/// Buildings are upper case, units lower case, obstacles `#` and open ground
/// `.`. A unit standing on a tile hides whatever lies beneath it.
pub(crate) fn draw(world: &World) -> String {
    let grid = query::grid_view(world);
    let columns = usize::try_from(grid.columns()).unwrap_or_default();
    let rows = usize::try_from(grid.rows()).unwrap_or_default();
    let mut cells = vec!['.'; columns * rows];

    let mut paint = |tile: TileCoord, glyph: char| {
        if let (Ok(column), Ok(row)) = (usize::try_from(tile.column()), usize::try_from(tile.row()))
        {
            if column < columns && row < rows {
                cells[row * columns + column] = glyph;
            }
        }
    };

    for tile in grid.iter().filter(|tile| tile.is_blocked()) {
        paint(tile.coord(), '#');
    }
    for building in query::buildings(world) {
        paint(building.tile, building_glyph(building.kind));
    }
    for unit in query::units(world) {
        paint(grid.tile_at(unit.position), unit_glyph(unit.archetype));
    }

    let mut map = String::with_capacity((columns + 1) * rows);
    for row in cells.chunks(columns.max(1)) {
        for glyph in row {
            map.push(*glyph);
        }
        let _ = writeln!(map);
    }
    map
}

fn building_glyph(kind: BuildingKind) -> char {
    match kind {
        BuildingKind::Headquarters => 'H',
        BuildingKind::Defense => 'D',
        BuildingKind::Wall => 'W',
        BuildingKind::GoldMine => 'G',
        BuildingKind::ElixirPump => 'E',
        BuildingKind::Barracks => 'B',
    }
}

fn unit_glyph(archetype: UnitArchetype) -> char {
    match archetype {
        UnitArchetype::Barbarian => 'b',
        UnitArchetype::Archer => 'a',
        UnitArchetype::Giant => 'g',
        UnitArchetype::Bomber => 'm',
    }
}
