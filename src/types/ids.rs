use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Identifier of a scenario in the scenario registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub i64);

/// Numeric identifier of an electorate, unique within its district type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectorateId(pub i64);

/// Position of a feature within a feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u32);

/// A census meshblock number. Displayed unpadded; see [`MeshblockNumber::formatted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshblockNumber(pub u32);

impl MeshblockNumber {
    /// Zero-padded seven digit form, e.g. `0000011`.
    pub fn formatted(&self) -> String { format!("{:07}", self.0) }
}

impl FromStr for MeshblockNumber {
    type Err = std::num::ParseIntError;

    /// Accepts both padded (`0000011`) and unpadded (`11`) forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        })*
    };
}

display_inner!(ScenarioId, ElectorateId, FeatureId, MeshblockNumber);
