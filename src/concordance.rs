//! Records exchanged with the external statistics service.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::{Error, Result}, types::Task};

static ELECTORATE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[NSM]?0*(\d+)\s*$").expect("static pattern")
});

/// Pad a meshblock number to seven digits. Longer inputs are returned trimmed.
pub fn format_meshblock_number(number: &str) -> String {
    format!("{:0>7}", number.trim())
}

/// Format an electorate id with the task letter and two digits: `("2", GS)` gives `S02`.
/// Already formatted ids are returned unchanged.
pub fn format_electorate_id(electorate: &str, task: Task) -> String {
    let trimmed = electorate.trim();
    match trimmed.chars().next() {
        Some('N' | 'S' | 'M') => trimmed.to_string(),
        _ => match ELECTORATE_CODE.captures(trimmed) {
            Some(caps) => format!("{}{:0>2}", task.letter(), &caps[1]),
            None => format!("{}{}", task.letter(), trimmed),
        },
    }
}

/// Inverse of [`format_electorate_id`]: `M01` gives `1`.
pub fn deformat_electorate_id(code: &str) -> Result<String> {
    let caps = ELECTORATE_CODE.captures(code)
        .ok_or_else(|| Error::InvalidCode(code.to_string()))?;
    Ok(caps[1].to_string())
}

/// One meshblock-to-electorate line of a concordance submitted for population statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcordanceItem {
    #[serde(rename = "censusStdMeshblock")]
    pub meshblock_number: String,
    #[serde(rename = "electorate")]
    pub electorate: String,
    #[serde(rename = "task")]
    pub task: Task,
}

impl ConcordanceItem {
    /// Build a concordance line, normalizing both identifiers.
    pub fn new(meshblock_number: &str, electorate: &str, task: Task) -> Self {
        Self {
            meshblock_number: format_meshblock_number(meshblock_number),
            electorate: format_electorate_id(electorate, task),
            task,
        }
    }
}

/// One row of the population table returned for a concordance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationRow {
    pub electorate: String,
    pub current_population: Option<i64>,
    pub variance_year_1: Option<f64>,
    pub variance_year_2: Option<f64>,
}
