//! Authoritative tile storage.

use auto_battle_core::{BuildingId, GridView, Tile, TileCoord};
use glam::Vec2;

/// Dense row-major tile array plus its world-space placement.
///
/// `set_blocked` is the only path through which obstruction changes, so the
/// world can turn every real transition into a `TileChanged` event.
#[derive(Clone, Debug)]
pub(crate) struct GridStore {
    columns: u32,
    rows: u32,
    cell_size: f32,
    origin: Vec2,
    tiles: Vec<Tile>,
}

impl GridStore {
    /// Allocates `columns * rows` open tiles with default cost.
    pub(crate) fn new(columns: u32, rows: u32, cell_size: f32, origin: Vec2) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let (columns, rows) = if capacity == 0 { (0, 0) } else { (columns, rows) };

        let mut tiles = Vec::with_capacity(capacity);
        for row in 0..rows {
            for column in 0..columns {
                let coord = TileCoord::new(
                    i32::try_from(column).unwrap_or(i32::MAX),
                    i32::try_from(row).unwrap_or(i32::MAX),
                );
                tiles.push(Tile::open(coord));
            }
        }

        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };

        Self {
            columns,
            rows,
            cell_size,
            origin,
            tiles,
        }
    }

    pub(crate) fn view(&self) -> GridView<'_> {
        GridView::new(
            &self.tiles,
            self.columns,
            self.rows,
            self.cell_size,
            self.origin,
        )
    }

    /// Updates obstruction and occupant of a tile.
    ///
    /// Returns `true` only when the blocked flag actually flipped. Invalid
    /// coordinates are ignored.
    pub(crate) fn set_blocked(
        &mut self,
        tile: TileCoord,
        blocked: bool,
        occupant: Option<BuildingId>,
    ) -> bool {
        self.tile_mut(tile)
            .map_or(false, |entry| entry.update(blocked, occupant))
    }

    /// Overwrites the movement cost of a tile, returning whether it existed.
    pub(crate) fn set_cost(&mut self, tile: TileCoord, cost: f32) -> bool {
        match self.tile_mut(tile) {
            Some(entry) => {
                entry.set_cost(cost);
                true
            }
            None => false,
        }
    }

    pub(crate) fn occupant(&self, tile: TileCoord) -> Option<BuildingId> {
        self.view().tile(tile).and_then(Tile::occupant)
    }

    fn tile_mut(&mut self, tile: TileCoord) -> Option<&mut Tile> {
        let column = u32::try_from(tile.column()).ok()?;
        let row = u32::try_from(tile.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let index = usize::try_from(row)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(column).ok()?)?;
        self.tiles.get_mut(index)
    }
}
