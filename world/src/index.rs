//! Lookup structures kept in sync with the entity tables.

use std::collections::{BTreeMap, BTreeSet};

use auto_battle_core::{EntityRef, Team, TileCoord, UnitId};

/// Live entity references grouped by team, in reference order.
#[derive(Clone, Debug, Default)]
pub(crate) struct TeamIndex {
    members: BTreeMap<Team, BTreeSet<EntityRef>>,
}

impl TeamIndex {
    pub(crate) fn insert(&mut self, team: Team, entity: EntityRef) {
        let _ = self.members.entry(team).or_default().insert(entity);
    }

    pub(crate) fn remove(&mut self, team: Team, entity: EntityRef) {
        if let Some(members) = self.members.get_mut(&team) {
            let _ = members.remove(&entity);
        }
    }

    pub(crate) fn members(&self, team: Team) -> impl Iterator<Item = EntityRef> + '_ {
        self.members
            .get(&team)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
    }
}

/// Unit ids bucketed by the tile containing their position.
///
/// Buckets are keyed by the unbounded tile coordinate so that units nudged
/// past the grid edge stay indexed.
#[derive(Clone, Debug, Default)]
pub(crate) struct SpatialBuckets {
    buckets: BTreeMap<TileCoord, BTreeSet<UnitId>>,
}

impl SpatialBuckets {
    pub(crate) fn insert(&mut self, unit: UnitId, tile: TileCoord) {
        let _ = self.buckets.entry(tile).or_default().insert(unit);
    }

    pub(crate) fn remove(&mut self, unit: UnitId, tile: TileCoord) {
        let emptied = match self.buckets.get_mut(&tile) {
            Some(bucket) => {
                let _ = bucket.remove(&unit);
                bucket.is_empty()
            }
            None => false,
        };

        if emptied {
            let _ = self.buckets.remove(&tile);
        }
    }

    pub(crate) fn relocate(&mut self, unit: UnitId, from: TileCoord, to: TileCoord) {
        if from == to {
            return;
        }

        self.remove(unit, from);
        self.insert(unit, to);
    }

    /// Units bucketed anywhere inside the inclusive tile rectangle.
    pub(crate) fn collect_in(&self, min: TileCoord, max: TileCoord, out: &mut Vec<UnitId>) {
        if min.column() > max.column() || min.row() > max.row() {
            return;
        }

        // Coordinates order column-major, so each column is one contiguous range.
        for column in min.column()..=max.column() {
            let start = TileCoord::new(column, min.row());
            let end = TileCoord::new(column, max.row());
            for (_, bucket) in self.buckets.range(start..=end) {
                out.extend(bucket.iter().copied());
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn is_occupied(&self, tile: TileCoord) -> bool {
        self.buckets
            .get(&tile)
            .map_or(false, |bucket| !bucket.is_empty())
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auto_battle_core::BuildingId;

    #[test]
    fn team_index_iterates_in_reference_order() {
        let mut index = TeamIndex::default();
        index.insert(Team::Enemy, EntityRef::Building(BuildingId::new(2)));
        index.insert(Team::Enemy, EntityRef::Unit(UnitId::new(7)));
        index.insert(Team::Player, EntityRef::Unit(UnitId::new(1)));

        let enemies: Vec<_> = index.members(Team::Enemy).collect();
        assert_eq!(
            enemies,
            vec![
                EntityRef::Unit(UnitId::new(7)),
                EntityRef::Building(BuildingId::new(2)),
            ]
        );

        index.remove(Team::Enemy, EntityRef::Unit(UnitId::new(7)));
        assert_eq!(index.members(Team::Enemy).count(), 1);
    }

    #[test]
    fn collect_in_respects_rectangle_bounds() {
        let mut buckets = SpatialBuckets::default();
        buckets.insert(UnitId::new(1), TileCoord::new(0, 0));
        buckets.insert(UnitId::new(2), TileCoord::new(2, 1));
        buckets.insert(UnitId::new(3), TileCoord::new(5, 1));
        buckets.insert(UnitId::new(4), TileCoord::new(-1, 1));

        let mut found = Vec::new();
        buckets.collect_in(TileCoord::new(-1, 1), TileCoord::new(2, 2), &mut found);
        found.sort();
        assert_eq!(found, vec![UnitId::new(2), UnitId::new(4)]);
    }

    #[test]
    fn relocate_moves_unit_between_buckets() {
        let mut buckets = SpatialBuckets::default();
        buckets.insert(UnitId::new(1), TileCoord::new(0, 0));
        buckets.relocate(UnitId::new(1), TileCoord::new(0, 0), TileCoord::new(1, 0));

        assert!(!buckets.is_occupied(TileCoord::new(0, 0)));
        assert!(buckets.is_occupied(TileCoord::new(1, 0)));
    }
}
