#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! A* path search over the battlefield grid.
//!
//! The pathfinder holds nothing but its connectivity setting. Every search
//! borrows a [`GridView`] immutably for its whole duration, so the grid cannot
//! change underneath a running search; callers that move searches onto worker
//! threads must hand each worker its own snapshot.

use std::{cmp::Reverse, collections::BinaryHeap, f32::consts::SQRT_2};

use auto_battle_core::{GridView, TileCoord};
use glam::Vec2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Neighbourhood used when expanding tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Orthogonal moves only.
    #[default]
    Four,
    /// Orthogonal and diagonal moves; diagonals never cut blocked corners.
    Eight,
}

/// Stateless A* route planner.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pathfinder {
    connectivity: Connectivity,
}

impl Pathfinder {
    /// Creates a pathfinder expanding the provided neighbourhood.
    #[must_use]
    pub const fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }

    /// Neighbourhood expanded by the pathfinder.
    #[must_use]
    pub const fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Computes a simplified route between two world positions.
    ///
    /// Waypoints are tile centres. The first waypoint is the centre of the
    /// start tile and the last is the centre of the goal tile. An empty result
    /// means no route exists.
    #[must_use]
    pub fn find_path(&self, grid: &GridView<'_>, start: Vec2, goal: Vec2) -> Vec<Vec2> {
        let (Some(start), Some(goal)) = (grid.world_to_tile(start), grid.world_to_tile(goal))
        else {
            return Vec::new();
        };

        simplify(&self.find_tile_path(grid, start, goal))
            .into_iter()
            .map(|tile| grid.tile_to_world(tile))
            .collect()
    }

    /// Computes the raw tile sequence between two tiles, both inclusive.
    ///
    /// Returns an empty path when the start is invalid, the goal is not
    /// walkable, or the open set runs dry before the goal is expanded.
    #[must_use]
    pub fn find_tile_path(
        &self,
        grid: &GridView<'_>,
        start: TileCoord,
        goal: TileCoord,
    ) -> Vec<TileCoord> {
        if !grid.is_valid(start) || !grid.is_walkable(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        let (Some(start_slot), Some(goal_slot)) = (slot(grid, start), slot(grid, goal)) else {
            return Vec::new();
        };

        let count = usize::try_from(u64::from(grid.columns()) * u64::from(grid.rows()))
            .unwrap_or(0);
        let mut cost_so_far = vec![f32::INFINITY; count];
        let mut came_from: Vec<Option<usize>> = vec![None; count];
        let mut closed = vec![false; count];
        let mut open = BinaryHeap::new();
        let mut sequence: u64 = 0;

        let cost_floor = grid.min_cost();
        let initial = self.heuristic(grid, start, goal, cost_floor);
        cost_so_far[start_slot] = 0.0;
        open.push(Reverse(OpenEntry {
            estimate: OrderedFloat(initial),
            remaining: OrderedFloat(initial),
            sequence,
            slot: start_slot,
        }));

        while let Some(Reverse(entry)) = open.pop() {
            if closed[entry.slot] {
                continue;
            }
            closed[entry.slot] = true;

            if entry.slot == goal_slot {
                return reconstruct(grid, &came_from, goal_slot);
            }

            let Some(current) = tile_of(grid, entry.slot) else {
                continue;
            };
            let current_cost = cost_so_far[entry.slot];

            for step in self.steps(grid, current) {
                let Some(next) = slot(grid, step.tile) else {
                    continue;
                };
                if closed[next] {
                    continue;
                }
                let Some(tile_cost) = grid.cost(step.tile) else {
                    continue;
                };

                let tentative = current_cost + grid.cell_size() * step.length * tile_cost;
                if tentative < cost_so_far[next] {
                    cost_so_far[next] = tentative;
                    came_from[next] = Some(entry.slot);
                    let remaining = self.heuristic(grid, step.tile, goal, cost_floor);
                    sequence = sequence.saturating_add(1);
                    open.push(Reverse(OpenEntry {
                        estimate: OrderedFloat(tentative + remaining),
                        remaining: OrderedFloat(remaining),
                        sequence,
                        slot: next,
                    }));
                }
            }
        }

        tracing::debug!(?start, ?goal, "open set exhausted without reaching goal");
        Vec::new()
    }

    /// Lower bound on the cost of travelling from `from` to `goal`.
    ///
    /// Scaling by the cheapest tile cost keeps the estimate admissible when
    /// terrain cheaper than the default exists.
    fn heuristic(&self, grid: &GridView<'_>, from: TileCoord, goal: TileCoord, floor: f32) -> f32 {
        let dx = from.column().abs_diff(goal.column()) as f32;
        let dy = from.row().abs_diff(goal.row()) as f32;
        let tiles = match self.connectivity {
            Connectivity::Four => dx + dy,
            Connectivity::Eight => {
                let (short, long) = if dx < dy { (dx, dy) } else { (dy, dx) };
                (long - short) + SQRT_2 * short
            }
        };
        tiles * grid.cell_size() * floor
    }

    fn steps(&self, grid: &GridView<'_>, tile: TileCoord) -> StepIter {
        let mut steps = StepIter::default();

        for (columns, rows) in ORTHOGONAL {
            let next = tile.offset(columns, rows);
            if grid.is_walkable(next) {
                steps.push(Step {
                    tile: next,
                    length: 1.0,
                });
            }
        }

        if self.connectivity == Connectivity::Eight {
            for (columns, rows) in DIAGONAL {
                let next = tile.offset(columns, rows);
                let corners_open = grid.is_walkable(tile.offset(columns, 0))
                    && grid.is_walkable(tile.offset(0, rows));
                if corners_open && grid.is_walkable(next) {
                    steps.push(Step {
                        tile: next,
                        length: SQRT_2,
                    });
                }
            }
        }

        steps
    }
}

/// Collapses runs of equal step direction, keeping only turning points.
///
/// The first and last tiles are always preserved.
#[must_use]
pub fn simplify(path: &[TileCoord]) -> Vec<TileCoord> {
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return Vec::new();
    };
    if path.len() <= 2 {
        return path.to_vec();
    }

    let mut simplified = vec![*first];
    for window in path.windows(3) {
        if direction(window[0], window[1]) != direction(window[1], window[2]) {
            simplified.push(window[1]);
        }
    }
    simplified.push(*last);
    simplified
}

/// Reports whether every tile entered while walking the waypoint polyline is
/// still walkable.
///
/// The tile of the first waypoint is where the walker already stands and is
/// not checked. Waypoints outside the grid make the route unusable.
#[must_use]
pub fn is_route_walkable(grid: &GridView<'_>, waypoints: &[Vec2]) -> bool {
    let mut tiles = Vec::with_capacity(waypoints.len());
    for waypoint in waypoints {
        match grid.world_to_tile(*waypoint) {
            Some(tile) => tiles.push(tile),
            None => return false,
        }
    }

    for pair in tiles.windows(2) {
        let mut cursor = pair[0];
        let goal = pair[1];
        while cursor != goal {
            let (columns, rows) = direction(cursor, goal);
            cursor = cursor.offset(columns, rows);
            if !grid.is_walkable(cursor) {
                return false;
            }
        }
    }

    true
}

const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    estimate: OrderedFloat<f32>,
    remaining: OrderedFloat<f32>,
    sequence: u64,
    slot: usize,
}

#[derive(Clone, Copy, Debug)]
struct Step {
    tile: TileCoord,
    length: f32,
}

#[derive(Clone, Debug, Default)]
struct StepIter {
    buffer: [Option<Step>; 8],
    len: usize,
    cursor: usize,
}

impl StepIter {
    fn push(&mut self, step: Step) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(step);
            self.len += 1;
        }
    }
}

impl Iterator for StepIter {
    type Item = Step;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}

fn direction(from: TileCoord, to: TileCoord) -> (i32, i32) {
    (
        (to.column() - from.column()).signum(),
        (to.row() - from.row()).signum(),
    )
}

fn slot(grid: &GridView<'_>, tile: TileCoord) -> Option<usize> {
    if !grid.is_valid(tile) {
        return None;
    }

    let width = usize::try_from(grid.columns()).ok()?;
    let row = usize::try_from(tile.row()).ok()?;
    let column = usize::try_from(tile.column()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

fn tile_of(grid: &GridView<'_>, slot: usize) -> Option<TileCoord> {
    let width = usize::try_from(grid.columns()).ok()?;
    if width == 0 {
        return None;
    }

    let column = i32::try_from(slot % width).ok()?;
    let row = i32::try_from(slot / width).ok()?;
    Some(TileCoord::new(column, row))
}

fn reconstruct(grid: &GridView<'_>, came_from: &[Option<usize>], goal: usize) -> Vec<TileCoord> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(slot) = current {
        if let Some(tile) = tile_of(grid, slot) {
            path.push(tile);
        }
        current = came_from.get(slot).copied().flatten();
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use auto_battle_core::Tile;

    #[test]
    fn four_connected_path_length_matches_manhattan_distance() {
        let tiles = open_tiles(10, 10);
        let grid = view(&tiles, 10, 10);
        let pathfinder = Pathfinder::new(Connectivity::Four);

        let start = TileCoord::new(1, 2);
        let goal = TileCoord::new(8, 6);
        let path = pathfinder.find_tile_path(&grid, start, goal);

        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len() - 1, start.manhattan_distance(goal) as usize);
        assert!(is_connected(&path, 1));
    }

    #[test]
    fn eight_connected_path_length_matches_chebyshev_distance() {
        let tiles = open_tiles(10, 10);
        let grid = view(&tiles, 10, 10);
        let pathfinder = Pathfinder::new(Connectivity::Eight);

        let start = TileCoord::new(0, 0);
        let goal = TileCoord::new(7, 3);
        let path = pathfinder.find_tile_path(&grid, start, goal);

        assert_eq!(path.len() - 1, start.chebyshev_distance(goal) as usize);
        assert!(is_connected(&path, 1));
    }

    #[test]
    fn enclosed_goal_yields_empty_path() {
        let mut tiles = open_tiles(7, 7);
        for (column, row) in [(2, 2), (3, 2), (4, 2), (2, 3), (4, 3), (2, 4), (3, 4), (4, 4)] {
            block(&mut tiles, 7, column, row);
        }
        let grid = view(&tiles, 7, 7);

        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let pathfinder = Pathfinder::new(connectivity);
            let path = pathfinder.find_tile_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 3));
            assert!(path.is_empty(), "{connectivity:?} escaped the enclosure");
        }
    }

    #[test]
    fn blocked_or_invalid_endpoints_short_circuit() {
        let mut tiles = open_tiles(5, 5);
        block(&mut tiles, 5, 4, 4);
        let grid = view(&tiles, 5, 5);
        let pathfinder = Pathfinder::default();

        assert!(pathfinder
            .find_tile_path(&grid, TileCoord::new(0, 0), TileCoord::new(4, 4))
            .is_empty());
        assert!(pathfinder
            .find_tile_path(&grid, TileCoord::new(-1, 0), TileCoord::new(2, 2))
            .is_empty());
        assert!(pathfinder
            .find_path(&grid, Vec2::new(50.0, 50.0), Vec2::new(900.0, 50.0))
            .is_empty());
    }

    #[test]
    fn blocked_start_tile_can_still_be_left() {
        let mut tiles = open_tiles(4, 1);
        block(&mut tiles, 4, 0, 0);
        let grid = view(&tiles, 4, 1);

        let path =
            Pathfinder::default().find_tile_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 0));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn diagonal_moves_never_cut_blocked_corners() {
        let mut tiles = open_tiles(3, 3);
        block(&mut tiles, 3, 1, 0);
        let grid = view(&tiles, 3, 3);
        let pathfinder = Pathfinder::new(Connectivity::Eight);

        let path = pathfinder.find_tile_path(&grid, TileCoord::new(0, 0), TileCoord::new(2, 0));
        assert!(!path.contains(&TileCoord::new(1, 0)));
        for pair in path.windows(2) {
            let (columns, rows) = direction(pair[0], pair[1]);
            if columns != 0 && rows != 0 {
                assert!(grid.is_walkable(pair[0].offset(columns, 0)));
                assert!(grid.is_walkable(pair[0].offset(0, rows)));
            }
        }
    }

    #[test]
    fn costly_tiles_are_avoided_when_cheaper_detour_exists() {
        let mut tiles = open_tiles(5, 3);
        tiles[index(5, 2, 1)].set_cost(10.0);
        let grid = view(&tiles, 5, 3);

        let path =
            Pathfinder::default().find_tile_path(&grid, TileCoord::new(0, 1), TileCoord::new(4, 1));
        assert!(!path.contains(&TileCoord::new(2, 1)));
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn cheap_terrain_is_exploited() {
        let mut tiles = open_tiles(5, 3);
        for column in 0..5 {
            tiles[index(5, column, 0)].set_cost(0.1);
        }
        let grid = view(&tiles, 5, 3);

        let path =
            Pathfinder::default().find_tile_path(&grid, TileCoord::new(0, 1), TileCoord::new(4, 1));
        assert_eq!(path.len(), 7, "detour over cheap row is optimal");
        assert!(path.contains(&TileCoord::new(2, 0)));
    }

    #[test]
    fn repeated_searches_are_identical() {
        let mut tiles = open_tiles(12, 12);
        for row in 2..10 {
            block(&mut tiles, 12, 6, row);
        }
        let grid = view(&tiles, 12, 12);

        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let pathfinder = Pathfinder::new(connectivity);
            let (from, to) = (Vec2::new(50.0, 550.0), Vec2::new(1_150.0, 550.0));
            let first = pathfinder.find_path(&grid, from, to);
            let second = pathfinder.find_path(&grid, from, to);
            assert!(!first.is_empty());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn simplify_keeps_only_turning_points() {
        let path = [
            TileCoord::new(0, 0),
            TileCoord::new(1, 0),
            TileCoord::new(2, 0),
            TileCoord::new(2, 1),
            TileCoord::new(2, 2),
            TileCoord::new(3, 3),
        ];

        assert_eq!(
            simplify(&path),
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(2, 0),
                TileCoord::new(2, 2),
                TileCoord::new(3, 3),
            ]
        );
        assert!(simplify(&[]).is_empty());
        assert_eq!(simplify(&[TileCoord::new(4, 4)]), vec![TileCoord::new(4, 4)]);
    }

    #[test]
    fn straight_path_simplifies_to_endpoints() {
        let tiles = open_tiles(10, 1);
        let grid = view(&tiles, 10, 1);

        let path =
            Pathfinder::default().find_path(&grid, Vec2::new(10.0, 10.0), Vec2::new(960.0, 90.0));
        assert_eq!(path, vec![Vec2::new(50.0, 50.0), Vec2::new(950.0, 50.0)]);
    }

    #[test]
    fn route_check_detects_blocked_segment() {
        let mut tiles = open_tiles(6, 6);
        let waypoints = [
            Vec2::new(50.0, 50.0),
            Vec2::new(550.0, 50.0),
            Vec2::new(550.0, 550.0),
        ];
        assert!(is_route_walkable(&view(&tiles, 6, 6), &waypoints));

        block(&mut tiles, 6, 5, 3);
        assert!(!is_route_walkable(&view(&tiles, 6, 6), &waypoints));
        assert!(is_route_walkable(&view(&tiles, 6, 6), &waypoints[..2]));
        assert!(!is_route_walkable(
            &view(&tiles, 6, 6),
            &[Vec2::new(50.0, 50.0), Vec2::new(50.0, 650.0)]
        ));
    }

    #[test]
    fn route_check_ignores_the_tile_underfoot() {
        let mut tiles = open_tiles(4, 1);
        block(&mut tiles, 4, 0, 0);
        let waypoints = [Vec2::new(50.0, 50.0), Vec2::new(350.0, 50.0)];
        assert!(is_route_walkable(&view(&tiles, 4, 1), &waypoints));
    }

    fn open_tiles(columns: i32, rows: i32) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                tiles.push(Tile::open(TileCoord::new(column, row)));
            }
        }
        tiles
    }

    fn view(tiles: &[Tile], columns: u32, rows: u32) -> GridView<'_> {
        GridView::new(tiles, columns, rows, 100.0, Vec2::ZERO)
    }

    fn index(columns: usize, column: usize, row: usize) -> usize {
        row * columns + column
    }

    fn block(tiles: &mut [Tile], columns: usize, column: usize, row: usize) {
        let _ = tiles[index(columns, column, row)].update(true, None);
    }

    fn is_connected(path: &[TileCoord], max_step: u32) -> bool {
        path.windows(2)
            .all(|pair| pair[0].chebyshev_distance(pair[1]) == max_step)
    }
}
