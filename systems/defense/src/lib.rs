#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that aims defensive structures and fires on cooldown.

use auto_battle_core::{
    cooldown_elapsed, Battlefield, BuildingId, BuildingSnapshot, Command, EntityRef, PlayMode,
    UnitId, UnitPresence,
};

/// Stationary defender loop: search, range check and cooldown-gated strike.
#[derive(Debug, Default)]
pub struct Defense {
    scratch: Vec<UnitPresence>,
}

impl Defense {
    /// Creates a defense system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits aiming and firing commands for one defensive building.
    ///
    /// A held target is kept while it is alive and within range. Otherwise the
    /// nearest hostile unit within range is chosen, ties going to the smaller
    /// unit id. Buildings without a defense profile are ignored.
    pub fn handle<B>(&mut self, field: &B, defense: BuildingId, out: &mut Vec<Command>)
    where
        B: Battlefield + ?Sized,
    {
        if field.play_mode() != PlayMode::Battle {
            return;
        }
        let Some(building) = field.building(defense) else {
            return;
        };
        let Some(profile) = building.kind.defense_profile(building.level) else {
            return;
        };

        let target = self
            .keep_target(field, &building, profile.range())
            .or_else(|| self.acquire_target(field, &building, profile.range()));

        if target != building.target {
            tracing::debug!(
                building = defense.get(),
                target = ?target.map(|id| id.get()),
                "defense retargeted"
            );
            out.push(Command::SetDefenseTarget {
                building: defense,
                target,
            });
        }

        let Some(target) = target else {
            return;
        };
        if cooldown_elapsed(building.last_attack_at, field.now(), profile.fire_interval()) {
            out.push(Command::Strike {
                attacker: EntityRef::Building(defense),
                target: EntityRef::Unit(target),
                damage: profile.damage(),
            });
        }
    }

    fn keep_target<B>(&self, field: &B, building: &BuildingSnapshot, range: f32) -> Option<UnitId>
    where
        B: Battlefield + ?Sized,
    {
        let held = building.target?;
        let target = field.resolve(EntityRef::Unit(held))?;
        let valid = target.health.is_alive()
            && target.team != building.team
            && target.position.distance(building.position) <= range;
        valid.then_some(held)
    }

    fn acquire_target<B>(
        &mut self,
        field: &B,
        building: &BuildingSnapshot,
        range: f32,
    ) -> Option<UnitId>
    where
        B: Battlefield + ?Sized,
    {
        self.scratch.clear();
        self.scratch.extend(
            field
                .units_within(building.position, range)
                .into_iter()
                .filter(|presence| presence.team != building.team),
        );

        let mut best: Option<BestCandidate> = None;
        for presence in &self.scratch {
            let candidate = BestCandidate {
                unit: presence.id,
                distance_sq: presence.position.distance_squared(building.position),
            };
            match &best {
                Some(existing) if !candidate.precedes(existing) => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|candidate| candidate.unit)
    }
}

#[derive(Clone, Copy, Debug)]
struct BestCandidate {
    unit: UnitId,
    distance_sq: f32,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }

        self.unit < other.unit
    }
}
