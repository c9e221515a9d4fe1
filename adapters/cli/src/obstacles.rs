use std::collections::BTreeSet;

use auto_battle_core::{GridView, TileCoord};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Picks up to `count` open tiles to block, reproducibly for a given seed.
///
/// Tiles that are already blocked or listed in `reserved` are never chosen.
pub(crate) fn pick(
    grid: GridView<'_>,
    reserved: &BTreeSet<TileCoord>,
    count: usize,
    seed: u64,
) -> Vec<TileCoord> {
    let mut candidates: Vec<TileCoord> = grid
        .iter()
        .filter(|tile| !tile.is_blocked())
        .map(|tile| tile.coord())
        .filter(|coord| !reserved.contains(coord))
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    candidates.shuffle(&mut rng);
    candidates.truncate(count);
    candidates
}
