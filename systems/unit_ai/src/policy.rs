//! Archetype target-search and attack policies.

use auto_battle_core::{
    Battlefield, BuildingKind, Command, EntityRef, TargetKind, TargetSnapshot, UnitArchetype,
    UnitSnapshot,
};
use glam::Vec2;

/// Rule used to choose what a unit pursues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetSearch {
    /// Any hostile, alive and targetable entity.
    Nearest,
    /// Hostile defensive structures first, then any other targetable building.
    Siege,
    /// Hostile walls first, then any other building, targetable or not.
    Demolition,
}

/// How a unit delivers damage once its target is within range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttackStyle {
    /// Instant damage applied to the target.
    Strike,
    /// Homing projectile carrying the damage.
    Projectile,
    /// Area burst that consumes the attacker.
    Detonate,
}

/// Search rule and attack style pair driving one archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Policy {
    search: TargetSearch,
    attack: AttackStyle,
}

impl Policy {
    /// Creates a policy from its two halves.
    #[must_use]
    pub const fn new(search: TargetSearch, attack: AttackStyle) -> Self {
        Self { search, attack }
    }

    /// Policy applied to units of the provided archetype.
    #[must_use]
    pub const fn for_archetype(archetype: UnitArchetype) -> Self {
        match archetype {
            UnitArchetype::Barbarian => Self::new(TargetSearch::Nearest, AttackStyle::Strike),
            UnitArchetype::Archer => Self::new(TargetSearch::Nearest, AttackStyle::Projectile),
            UnitArchetype::Giant => Self::new(TargetSearch::Siege, AttackStyle::Strike),
            UnitArchetype::Bomber => Self::new(TargetSearch::Demolition, AttackStyle::Detonate),
        }
    }

    /// Target-search half of the policy.
    #[must_use]
    pub const fn search(self) -> TargetSearch {
        self.search
    }

    /// Attack half of the policy.
    #[must_use]
    pub const fn attack(self) -> AttackStyle {
        self.attack
    }

    /// Chooses the entity `unit` should pursue next.
    ///
    /// Within each preference tier an entity already inside attack range wins
    /// immediately; otherwise the globally nearest one is returned. Equal
    /// distances resolve to the smaller entity reference.
    #[must_use]
    pub fn find_target<B>(self, field: &B, unit: &UnitSnapshot) -> Option<TargetSnapshot>
    where
        B: Battlefield + ?Sized,
    {
        let origin = unit.position;
        let range = unit.profile.attack_range();

        match self.search {
            TargetSearch::Nearest => pick(
                origin,
                range,
                field
                    .hostile_targets(unit.team)
                    .into_iter()
                    .filter(|target| target.health.is_alive() && target.targetable),
            ),
            TargetSearch::Siege => {
                let buildings: Vec<_> = field
                    .hostile_buildings(unit.team)
                    .into_iter()
                    .filter(|target| target.health.is_alive())
                    .collect();
                pick(
                    origin,
                    range,
                    buildings
                        .iter()
                        .copied()
                        .filter(|target| is_kind(target, BuildingKind::Defense)),
                )
                .or_else(|| {
                    pick(
                        origin,
                        range,
                        buildings.iter().copied().filter(|target| {
                            target.targetable && !is_kind(target, BuildingKind::Defense)
                        }),
                    )
                })
            }
            TargetSearch::Demolition => {
                let buildings: Vec<_> = field
                    .hostile_buildings(unit.team)
                    .into_iter()
                    .filter(|target| target.health.is_alive())
                    .collect();
                pick(
                    origin,
                    range,
                    buildings
                        .iter()
                        .copied()
                        .filter(|target| is_kind(target, BuildingKind::Wall)),
                )
                .or_else(|| {
                    nearest(
                        origin,
                        buildings
                            .iter()
                            .copied()
                            .filter(|target| !is_kind(target, BuildingKind::Wall)),
                    )
                })
            }
        }
    }

    /// Command delivering one attack from `unit` against `target`.
    #[must_use]
    pub fn attack_command(self, unit: &UnitSnapshot, target: &TargetSnapshot) -> Command {
        match self.attack {
            AttackStyle::Strike => Command::Strike {
                attacker: EntityRef::Unit(unit.id),
                target: target.entity,
                damage: unit.profile.damage(),
            },
            AttackStyle::Projectile => Command::LaunchProjectile {
                owner: unit.id,
                target: target.entity,
                damage: unit.profile.damage(),
            },
            AttackStyle::Detonate => Command::Detonate { unit: unit.id },
        }
    }
}

/// Nearest candidate to `origin`, ties resolved by entity reference.
pub(crate) fn nearest(
    origin: Vec2,
    candidates: impl IntoIterator<Item = TargetSnapshot>,
) -> Option<TargetSnapshot> {
    pick(origin, f32::NEG_INFINITY, candidates)
}

fn pick(
    origin: Vec2,
    range: f32,
    candidates: impl IntoIterator<Item = TargetSnapshot>,
) -> Option<TargetSnapshot> {
    let mut best: Option<Candidate> = None;
    for target in candidates {
        let distance = origin.distance(target.position);
        if distance <= range {
            return Some(target);
        }

        let candidate = Candidate { target, distance };
        match &best {
            Some(existing) if !candidate.precedes(existing) => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|candidate| candidate.target)
}

fn is_kind(target: &TargetSnapshot, kind: BuildingKind) -> bool {
    target.kind == TargetKind::Building(kind)
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    target: TargetSnapshot,
    distance: f32,
}

impl Candidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance != other.distance {
            return self.distance < other.distance;
        }

        self.target.entity < other.target.entity
    }
}
