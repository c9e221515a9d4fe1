//! Tile coordinates and the read-only grid view shared by every system.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::BuildingId;

/// Movement cost applied to freshly generated tiles.
pub const DEFAULT_TILE_COST: f32 = 1.0;

/// Location of a single tile expressed as signed column and row indices.
///
/// Coordinates are signed so that positions left of or above the grid origin
/// map to negative, and therefore invalid, tiles instead of wrapping around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: i32,
    row: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the tile.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the tile.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the tile displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column.saturating_add(columns),
            row: self.row.saturating_add(rows),
        }
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Chebyshev (king move) distance between two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

/// One cell of the battlefield grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    coord: TileCoord,
    blocked: bool,
    occupant: Option<BuildingId>,
    cost: f32,
}

impl Tile {
    /// Creates an unblocked, unoccupied tile with the default movement cost.
    #[must_use]
    pub const fn open(coord: TileCoord) -> Self {
        Self {
            coord,
            blocked: false,
            occupant: None,
            cost: DEFAULT_TILE_COST,
        }
    }

    /// Coordinate of the tile within its grid.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Reports whether the tile obstructs movement.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Building physically occupying the tile, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<BuildingId> {
        self.occupant
    }

    /// Movement cost multiplier applied when stepping onto the tile.
    #[must_use]
    pub const fn cost(&self) -> f32 {
        self.cost
    }

    /// Overwrites the obstruction state and occupant, returning whether the
    /// blocked flag changed.
    ///
    /// Only the grid owner may call this; every other crate sees tiles
    /// through a [`GridView`].
    pub fn update(&mut self, blocked: bool, occupant: Option<BuildingId>) -> bool {
        let changed = self.blocked != blocked;
        self.blocked = blocked;
        self.occupant = occupant;
        changed
    }

    /// Overwrites the movement cost multiplier. Negative values clamp to zero.
    pub fn set_cost(&mut self, cost: f32) {
        self.cost = if cost.is_finite() { cost.max(0.0) } else { DEFAULT_TILE_COST };
    }
}

/// Read-only view into the dense tile grid.
///
/// Holding a view borrows the grid immutably, so no mutation can interleave
/// with a query that spans several calls (such as a path search).
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    tiles: &'a [Tile],
    columns: u32,
    rows: u32,
    cell_size: f32,
    origin: Vec2,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major tile slice.
    #[must_use]
    pub fn new(tiles: &'a [Tile], columns: u32, rows: u32, cell_size: f32, origin: Vec2) -> Self {
        Self {
            tiles,
            columns,
            rows,
            cell_size,
            origin,
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a square tile in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space position of the grid's upper-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Reports whether the coordinate lies inside the grid bounds.
    #[must_use]
    pub fn is_valid(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some()
    }

    /// Maps a world position to tile coordinates without bounds checking.
    ///
    /// The result may lie outside the grid; use [`GridView::world_to_tile`]
    /// when only valid tiles are of interest.
    #[must_use]
    pub fn tile_at(&self, point: Vec2) -> TileCoord {
        if self.cell_size <= 0.0 || !self.cell_size.is_finite() {
            return TileCoord::new(-1, -1);
        }

        let local = (point - self.origin) / self.cell_size;
        TileCoord::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    /// Maps a world position to the tile containing it, if that tile is valid.
    #[must_use]
    pub fn world_to_tile(&self, point: Vec2) -> Option<TileCoord> {
        let tile = self.tile_at(point);
        self.is_valid(tile).then_some(tile)
    }

    /// Returns the world-space centre of the provided tile.
    #[must_use]
    pub fn tile_to_world(&self, tile: TileCoord) -> Vec2 {
        self.origin
            + Vec2::new(
                (tile.column() as f32 + 0.5) * self.cell_size,
                (tile.row() as f32 + 0.5) * self.cell_size,
            )
    }

    /// Returns the tile stored at the coordinate, if valid.
    #[must_use]
    pub fn tile(&self, tile: TileCoord) -> Option<&'a Tile> {
        self.index(tile).and_then(|index| self.tiles.get(index))
    }

    /// Reports whether a unit may stand on the tile.
    ///
    /// Invalid coordinates are never walkable.
    #[must_use]
    pub fn is_walkable(&self, tile: TileCoord) -> bool {
        self.tile(tile).map_or(false, |tile| !tile.is_blocked())
    }

    /// Movement cost of the tile, if valid.
    #[must_use]
    pub fn cost(&self, tile: TileCoord) -> Option<f32> {
        self.tile(tile).map(Tile::cost)
    }

    /// Smallest movement cost present anywhere in the grid.
    ///
    /// Falls back to the default cost for an empty grid.
    #[must_use]
    pub fn min_cost(&self) -> f32 {
        self.tiles
            .iter()
            .map(Tile::cost)
            .reduce(f32::min)
            .unwrap_or(DEFAULT_TILE_COST)
            .max(0.0)
    }

    /// Iterator over every tile in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Tile> + 'a {
        self.tiles.iter()
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        let column = u32::try_from(tile.column()).ok()?;
        let row = u32::try_from(tile.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_tiles(columns: u32, rows: u32) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for row in 0..rows as i32 {
            for column in 0..columns as i32 {
                tiles.push(Tile::open(TileCoord::new(column, row)));
            }
        }
        tiles
    }

    #[test]
    fn out_of_bounds_tiles_are_never_walkable() {
        let tiles = open_tiles(4, 3);
        let view = GridView::new(&tiles, 4, 3, 10.0, Vec2::ZERO);

        for tile in [
            TileCoord::new(-1, 0),
            TileCoord::new(0, -1),
            TileCoord::new(4, 0),
            TileCoord::new(0, 3),
            TileCoord::new(i32::MIN, i32::MAX),
        ] {
            assert!(!view.is_walkable(tile), "{tile:?} must not be walkable");
        }
        assert!(view.is_walkable(TileCoord::new(3, 2)));
    }

    #[test]
    fn world_to_tile_round_trips_every_tile_centre() {
        let tiles = open_tiles(7, 5);
        let view = GridView::new(&tiles, 7, 5, 100.0, Vec2::new(-250.0, 40.0));

        for tile in view.iter() {
            let centre = view.tile_to_world(tile.coord());
            assert_eq!(view.world_to_tile(centre), Some(tile.coord()));
        }
    }

    #[test]
    fn positions_before_origin_are_invalid() {
        let tiles = open_tiles(2, 2);
        let view = GridView::new(&tiles, 2, 2, 50.0, Vec2::new(100.0, 100.0));

        assert_eq!(view.tile_at(Vec2::new(99.0, 120.0)), TileCoord::new(-1, 0));
        assert_eq!(view.world_to_tile(Vec2::new(99.0, 120.0)), None);
        assert_eq!(
            view.world_to_tile(Vec2::new(100.0, 100.0)),
            Some(TileCoord::new(0, 0))
        );
    }

    #[test]
    fn update_reports_only_blocked_transitions() {
        let mut tile = Tile::open(TileCoord::new(0, 0));
        assert!(tile.update(true, Some(BuildingId::new(3))));
        assert!(!tile.update(true, Some(BuildingId::new(4))));
        assert_eq!(tile.occupant(), Some(BuildingId::new(4)));
        assert!(tile.update(false, None));
    }

    #[test]
    fn min_cost_tracks_cheapest_tile() {
        let mut tiles = open_tiles(3, 1);
        tiles[1].set_cost(0.5);
        tiles[2].set_cost(-4.0);
        let view = GridView::new(&tiles, 3, 1, 1.0, Vec2::ZERO);
        assert_eq!(view.min_cost(), 0.0);
    }

    #[test]
    fn distances_match_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, -1);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(origin.chebyshev_distance(destination), 3);
    }
}
