//! Homing projectiles fired by ranged units.

use std::{collections::BTreeMap, time::Duration};

use auto_battle_core::{EntityRef, ProjectileId, ProjectileSnapshot, UnitId};
use glam::Vec2;

/// Flight speed in world units per second.
pub(crate) const PROJECTILE_SPEED: f32 = 1_000.0;
/// Distance at which a projectile counts as having reached its target.
pub(crate) const PROJECTILE_HIT_RADIUS: f32 = 50.0;
/// Maximum time a projectile may stay in flight.
pub(crate) const PROJECTILE_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) owner: UnitId,
    pub(crate) target: EntityRef,
    pub(crate) position: Vec2,
    pub(crate) damage: f32,
    pub(crate) age: Duration,
}

impl Projectile {
    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            owner: self.owner,
            target: self.target,
            position: self.position,
            damage: self.damage,
            age: self.age,
        }
    }

    /// Advances the projectile toward `target_position`.
    pub(crate) fn advance(&mut self, target_position: Vec2, dt: Duration) -> Flight {
        self.age = self.age.saturating_add(dt);
        if self.age > PROJECTILE_LIFETIME {
            return Flight::Expired;
        }

        let offset = target_position - self.position;
        let distance = offset.length();
        let step = (PROJECTILE_SPEED * dt.as_secs_f32()).min(distance);
        if distance > f32::EPSILON {
            self.position += offset / distance * step;
        }

        if self.position.distance(target_position) <= PROJECTILE_HIT_RADIUS {
            Flight::Arrived
        } else {
            Flight::InFlight
        }
    }
}

/// Outcome of advancing a projectile by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flight {
    InFlight,
    Arrived,
    Expired,
}

#[derive(Debug)]
pub(crate) struct ProjectileRegistry {
    entries: BTreeMap<ProjectileId, Projectile>,
    next_projectile_id: ProjectileId,
}

impl ProjectileRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_projectile_id: ProjectileId::new(0),
        }
    }

    pub(crate) fn launch(
        &mut self,
        owner: UnitId,
        target: EntityRef,
        position: Vec2,
        damage: f32,
    ) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id = ProjectileId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(
            id,
            Projectile {
                id,
                owner,
                target,
                position,
                damage,
                age: Duration::ZERO,
            },
        );
        id
    }

    pub(crate) fn ids(&self) -> Vec<ProjectileId> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn get_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: ProjectileId) -> Option<Projectile> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.entries.values()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
