use auto_battle_core::{BuildingRecord, UnitRecord};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LAYOUT_DOMAIN: &str = "battle";
const LAYOUT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const LAYOUT_HEADER: &str = "battle:v1";
const FIELD_DELIMITER: char = ':';

/// Army and base composition together with the grid it was captured on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct LayoutSnapshot {
    /// Number of tile columns contained in the grid.
    pub(crate) columns: u32,
    /// Number of tile rows contained in the grid.
    pub(crate) rows: u32,
    /// Edge length of a tile in world units.
    pub(crate) cell_size: f32,
    /// Attacking units.
    pub(crate) units: Vec<UnitRecord>,
    /// Defending buildings.
    pub(crate) buildings: Vec<BuildingRecord>,
}

impl LayoutSnapshot {
    /// Encodes the snapshot into a single-line string.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = Payload {
            cell_size: self.cell_size,
            units: self.units.clone(),
            buildings: self.buildings.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{LAYOUT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from its string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != LAYOUT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != LAYOUT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: Payload =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        Ok(Self {
            columns,
            rows,
            cell_size: decoded.cell_size,
            units: decoded.units,
            buildings: decoded.buildings,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Payload {
    cell_size: f32,
    units: Vec<UnitRecord>,
    buildings: Vec<BuildingRecord>,
}

/// Errors raised while reading or writing layout strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The string was empty or whitespace only.
    #[error("layout string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The grid dimensions segment was missing.
    #[error("layout string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The prefix named another format.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version is not understood by this build.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload JSON could not be read or written.
    #[error("could not process layout payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;
    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
