//! Archetype and building stat tables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hit points carried by a unit or building.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Health(f32);

impl Health {
    /// Creates a new health value. Negative and non-finite inputs clamp to zero.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.max(0.0))
        } else {
            Self(0.0)
        }
    }

    /// Retrieves the numeric representation of the health value.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }

    /// Reports whether any health remains.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0 > 0.0
    }

    /// Subtracts up to `amount`, returning the reduced value and the portion
    /// actually removed.
    #[must_use]
    pub fn damaged(self, amount: f32) -> (Self, f32) {
        if !amount.is_finite() || amount <= 0.0 {
            return (self, 0.0);
        }

        let dealt = amount.min(self.0);
        (Self(self.0 - dealt), dealt)
    }
}

/// Behavioural class of a combat unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitArchetype {
    /// Melee fighter that strikes the nearest hostile entity.
    Barbarian,
    /// Ranged fighter that fires homing projectiles.
    Archer,
    /// Siege unit that seeks out defensive structures.
    Giant,
    /// Demolition unit that blows itself up next to walls.
    Bomber,
}

impl UnitArchetype {
    /// Every archetype in declaration order.
    pub const ALL: [UnitArchetype; 4] = [
        UnitArchetype::Barbarian,
        UnitArchetype::Archer,
        UnitArchetype::Giant,
        UnitArchetype::Bomber,
    ];

    /// Default combat statistics for the archetype.
    #[must_use]
    pub fn profile(self) -> UnitProfile {
        match self {
            Self::Barbarian => UnitProfile::new(150.0, 150.0, 15.0, 250.0, Duration::from_secs(1)),
            Self::Archer => {
                UnitProfile::new(80.0, 500.0, 12.0, 200.0, Duration::from_millis(1_200))
            }
            Self::Giant => {
                UnitProfile::new(500.0, 150.0, 30.0, 150.0, Duration::from_millis(1_500))
            }
            Self::Bomber => UnitProfile::new(50.0, 100.0, 0.0, 350.0, Duration::ZERO)
                .with_blast(BlastProfile::new(300.0, 200.0)),
        }
    }
}

/// Area damage released when a demolition unit detonates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlastProfile {
    radius: f32,
    damage: f32,
}

impl BlastProfile {
    /// Creates a blast description.
    #[must_use]
    pub const fn new(radius: f32, damage: f32) -> Self {
        Self { radius, damage }
    }

    /// Radius of the blast in world units.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Damage dealt once to every building caught in the blast.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }
}

/// Combat statistics carried by a spawned unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    max_health: f32,
    attack_range: f32,
    damage: f32,
    move_speed: f32,
    attack_interval: Duration,
    blast: Option<BlastProfile>,
}

impl UnitProfile {
    /// Creates a profile without a blast component.
    #[must_use]
    pub const fn new(
        max_health: f32,
        attack_range: f32,
        damage: f32,
        move_speed: f32,
        attack_interval: Duration,
    ) -> Self {
        Self {
            max_health,
            attack_range,
            damage,
            move_speed,
            attack_interval,
            blast: None,
        }
    }

    /// Attaches a blast component, turning the unit into a demolition unit.
    #[must_use]
    pub const fn with_blast(mut self, blast: BlastProfile) -> Self {
        self.blast = Some(blast);
        self
    }

    /// Health assigned on spawn.
    #[must_use]
    pub fn max_health(&self) -> Health {
        Health::new(self.max_health)
    }

    /// Distance in world units at which the unit can attack.
    #[must_use]
    pub const fn attack_range(&self) -> f32 {
        self.attack_range
    }

    /// Damage dealt by a single attack.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Movement speed in world units per second.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Minimum simulated time between two attacks.
    #[must_use]
    pub const fn attack_interval(&self) -> Duration {
        self.attack_interval
    }

    /// Blast released on detonation, if the unit carries one.
    #[must_use]
    pub const fn blast(&self) -> Option<BlastProfile> {
        self.blast
    }
}

/// Types of buildings that may be placed on the battlefield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Town hall; losing every enemy headquarters ends the battle.
    Headquarters,
    /// Stationary defender that shoots at hostile units.
    Defense,
    /// Obstruction that only demolition units deliberately target.
    Wall,
    /// Resource producer.
    GoldMine,
    /// Resource producer.
    ElixirPump,
    /// Houses units between battles.
    Barracks,
}

impl BuildingKind {
    /// Every building kind in declaration order.
    pub const ALL: [BuildingKind; 6] = [
        BuildingKind::Headquarters,
        BuildingKind::Defense,
        BuildingKind::Wall,
        BuildingKind::GoldMine,
        BuildingKind::ElixirPump,
        BuildingKind::Barracks,
    ];

    /// Health assigned on placement when no override is supplied.
    #[must_use]
    pub fn max_health(self) -> Health {
        Health::new(match self {
            Self::Headquarters => 5_000.0,
            Self::Defense | Self::Barracks => 800.0,
            Self::Wall => 200.0,
            Self::GoldMine | Self::ElixirPump => 600.0,
        })
    }

    /// Reports whether generic target searches consider the building.
    #[must_use]
    pub const fn is_targetable(self) -> bool {
        !matches!(self, Self::Wall)
    }

    /// Firing statistics for the building at the provided level.
    ///
    /// Only [`BuildingKind::Defense`] fires; every other kind yields `None`.
    #[must_use]
    pub fn defense_profile(self, level: u32) -> Option<DefenseProfile> {
        match self {
            Self::Defense => Some(DefenseProfile::BASE.at_level(level)),
            _ => None,
        }
    }
}

/// Firing statistics of a stationary defender.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefenseProfile {
    range: f32,
    damage: f32,
    fire_interval: Duration,
}

impl DefenseProfile {
    /// Statistics of a level one defender.
    pub const BASE: DefenseProfile = DefenseProfile::new(600.0, 20.0, Duration::from_secs(1));

    const DAMAGE_PER_LEVEL: f32 = 0.15;
    const RANGE_PER_LEVEL: f32 = 0.10;

    /// Creates a defender profile.
    #[must_use]
    pub const fn new(range: f32, damage: f32, fire_interval: Duration) -> Self {
        Self {
            range,
            damage,
            fire_interval,
        }
    }

    /// Scales the profile for an upgraded building, compounding the bonus once
    /// per level above one. Levels below one count as one.
    #[must_use]
    pub fn at_level(self, level: u32) -> Self {
        let upgrades = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
        Self {
            range: self.range * (1.0 + Self::RANGE_PER_LEVEL).powi(upgrades),
            damage: self.damage * (1.0 + Self::DAMAGE_PER_LEVEL).powi(upgrades),
            fire_interval: self.fire_interval,
        }
    }

    /// Targeting radius in world units.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Damage dealt per shot.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Minimum simulated time between shots.
    #[must_use]
    pub const fn fire_interval(&self) -> Duration {
        self.fire_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_bomber_carries_a_blast() {
        for archetype in UnitArchetype::ALL {
            let blast = archetype.profile().blast();
            assert_eq!(
                blast.is_some(),
                archetype == UnitArchetype::Bomber,
                "unexpected blast for {archetype:?}"
            );
        }
        assert_eq!(
            UnitArchetype::Bomber.profile().blast(),
            Some(BlastProfile::new(300.0, 200.0))
        );
    }

    #[test]
    fn walls_are_the_only_untargetable_buildings() {
        let untargetable: Vec<_> = BuildingKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_targetable())
            .collect();
        assert_eq!(untargetable, vec![BuildingKind::Wall]);
    }

    #[test]
    fn defense_profile_scales_with_level() {
        let level_one = BuildingKind::Defense
            .defense_profile(1)
            .expect("defense fires");
        let level_three = BuildingKind::Defense
            .defense_profile(3)
            .expect("defense fires");

        assert!((level_one.range() - 600.0).abs() < 1e-3);
        assert!((level_three.damage() - 26.45).abs() < 1e-3);
        assert!((level_three.range() - 726.0).abs() < 1e-3);
        assert_eq!(BuildingKind::Defense.defense_profile(0), Some(level_one));
        assert_eq!(BuildingKind::Wall.defense_profile(2), None);
    }

    #[test]
    fn damage_never_exceeds_remaining_health() {
        let (remaining, dealt) = Health::new(30.0).damaged(45.0);
        assert_eq!(remaining.get(), 0.0);
        assert_eq!(dealt, 30.0);
        assert!(!remaining.is_alive());

        let (unchanged, dealt) = Health::new(30.0).damaged(-5.0);
        assert_eq!(unchanged, Health::new(30.0));
        assert_eq!(dealt, 0.0);
    }
}
