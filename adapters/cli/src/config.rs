use std::{fs, path::Path};

use anyhow::{Context, Result};
use auto_battle_core::{BuildingKind, BuildingRecord, TileCoord, UnitArchetype, UnitRecord};
use auto_battle_simulation::SimulationConfig;
use serde::Deserialize;

use crate::layout_transfer::LayoutSnapshot;

/// Scenario read from a TOML file. Every field is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ScenarioConfig {
    /// Grid geometry and controller tuning.
    pub(crate) simulation: SimulationConfig,
    /// Units spawned for the attacking player.
    pub(crate) units: Vec<UnitRecord>,
    /// Buildings placed for the defending side.
    pub(crate) buildings: Vec<BuildingRecord>,
}

impl ScenarioConfig {
    /// Reads and parses the scenario at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Replaces the grid and composition with a transferred layout.
    pub(crate) fn adopt(&mut self, layout: LayoutSnapshot) {
        self.simulation.columns = layout.columns;
        self.simulation.rows = layout.rows;
        self.simulation.cell_size = layout.cell_size;
        self.units = layout.units;
        self.buildings = layout.buildings;
    }

    /// Captures the grid and composition as a transferable layout.
    pub(crate) fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            columns: self.simulation.columns,
            rows: self.simulation.rows,
            cell_size: self.simulation.cell_size,
            units: self.units.clone(),
            buildings: self.buildings.clone(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let unit = |archetype, column, row| UnitRecord {
            archetype,
            tile: TileCoord::new(column, row),
        };
        let building = |kind, column, row| BuildingRecord {
            kind,
            tile: TileCoord::new(column, row),
            level: 1,
        };

        Self {
            simulation: SimulationConfig {
                columns: 16,
                rows: 12,
                ..SimulationConfig::default()
            },
            units: vec![
                unit(UnitArchetype::Barbarian, 0, 4),
                unit(UnitArchetype::Barbarian, 0, 6),
                unit(UnitArchetype::Archer, 1, 5),
                unit(UnitArchetype::Giant, 0, 5),
                unit(UnitArchetype::Bomber, 1, 7),
            ],
            buildings: vec![
                building(BuildingKind::Headquarters, 12, 6),
                building(BuildingKind::Defense, 10, 4),
                building(BuildingKind::GoldMine, 13, 3),
                building(BuildingKind::ElixirPump, 13, 9),
                building(BuildingKind::Barracks, 8, 8),
                building(BuildingKind::Wall, 9, 5),
                building(BuildingKind::Wall, 9, 6),
                building(BuildingKind::Wall, 9, 7),
            ],
        }
    }
}
