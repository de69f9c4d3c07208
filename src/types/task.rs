use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::Error, types::ElectorateId};

/// An electorate type, also used as the active redistricting task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Task {
    #[serde(rename = "GN")]
    GeneralNorth,   // General North Island
    #[serde(rename = "GS")]
    GeneralSouth,   // General South Island
    #[serde(rename = "M")]
    Maori,          // Māori
}

impl Task {
    pub const ALL: [Task; 3] = [Task::GeneralNorth, Task::GeneralSouth, Task::Maori];

    /// Short type code, as stored in the electorate `type` field.
    pub fn code(&self) -> &'static str {
        match self {
            Task::GeneralNorth => "GN",
            Task::GeneralSouth => "GS",
            Task::Maori => "M",
        }
    }

    /// Single letter prefix used in concordance electorate ids.
    pub fn letter(&self) -> char {
        match self {
            Task::GeneralNorth => 'N',
            Task::GeneralSouth => 'S',
            Task::Maori => 'M',
        }
    }

    /// Human readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Task::GeneralNorth => "General North Island",
            Task::GeneralSouth => "General South Island",
            Task::Maori => "Māori",
        }
    }

    /// Name of the assignment field holding electorates of this type.
    pub fn electorate_field(&self) -> &'static str {
        match self {
            Task::GeneralNorth => "gn_id",
            Task::GeneralSouth => "gs_id",
            Task::Maori => "m_id",
        }
    }

    /// Electorate code with a two digit id, e.g. `GN07`.
    pub fn electorate_code(&self, id: ElectorateId) -> String {
        format!("{}{:02}", self.code(), id.0)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GN" => Ok(Task::GeneralNorth),
            "GS" => Ok(Task::GeneralSouth),
            "M" => Ok(Task::Maori),
            _ => Err(Error::UnknownDistrictType(s.to_string())),
        }
    }
}
