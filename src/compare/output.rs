use std::collections::{BTreeMap, BTreeSet};

use geo::MultiPolygon;

use crate::{
    concordance::{deformat_electorate_id, ConcordanceItem, PopulationRow},
    error::{Error, Result},
    types::{ElectorateId, MeshblockNumber, Task},
};

/// A meshblock whose electorate differs between the two scenarios.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedMeshblock {
    /// Seven digit meshblock number.
    pub meshblock_number: String,
    pub previous_electorate_id: ElectorateId,
    pub new_electorate_id: ElectorateId,
    /// Electorate codes such as `GN07`.
    pub previous_electorate: String,
    pub new_electorate: String,
    /// Dummy electorate label such as `D01`.
    pub dummy_electorate: String,
    pub geometry: MultiPolygon<f64>,
}

/// One connected area of meshblocks that moved between the same pair of electorates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedArea {
    /// Dummy electorate code for the task, such as `GN01`.
    pub dummy_electorate_id: String,
    pub previous_electorate: String,
    pub new_electorate: String,
    pub current_population: Option<i64>,
    pub variance_year_1: Option<f64>,
    pub variance_year_2: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

/// Everything a scenario comparison produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutput {
    pub task: Task,
    pub base_electorates: BTreeMap<MeshblockNumber, ElectorateId>,
    pub secondary_electorates: BTreeMap<MeshblockNumber, ElectorateId>,
    /// Meshblocks whose electorate differs, including those unassigned in the secondary scenario.
    pub changed: BTreeSet<MeshblockNumber>,
    /// Changed meshblocks with no electorate in the secondary scenario.
    pub unassigned: Vec<MeshblockNumber>,
    /// Changed meshblocks that fell outside every retained area.
    pub skipped: Vec<MeshblockNumber>,
    /// Dummy ids handed out, in assignment order.
    pub dummy_electorates: Vec<ElectorateId>,
    pub changed_meshblocks: Vec<ChangedMeshblock>,
    pub changed_areas: Vec<ChangedArea>,
    pub concordance: Vec<ConcordanceItem>,
}

impl ComparisonOutput {
    pub(crate) fn empty(task: Task) -> Self {
        Self {
            task,
            base_electorates: BTreeMap::new(),
            secondary_electorates: BTreeMap::new(),
            changed: BTreeSet::new(),
            unassigned: Vec::new(),
            skipped: Vec::new(),
            dummy_electorates: Vec::new(),
            changed_meshblocks: Vec::new(),
            changed_areas: Vec::new(),
            concordance: Vec::new(),
        }
    }

    /// Label of a dummy electorate in the changed meshblocks output.
    pub fn dummy_label(id: ElectorateId) -> String { format!("D{:02}", id.0) }

    /// Fill population figures of changed areas from a population table.
    /// Rows for ids that are not dummy electorates of this run are ignored;
    /// returns the number of areas updated. Every code is parsed before
    /// any area changes.
    pub fn apply_population_table(&mut self, rows: &[PopulationRow]) -> Result<usize> {
        let parsed = rows.iter()
            .map(|row| {
                let id = deformat_electorate_id(&row.electorate)?
                    .parse::<i64>()
                    .map(ElectorateId)
                    .map_err(|_| Error::InvalidCode(row.electorate.clone()))?;
                Ok((id, row))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut updated = 0;
        for (id, row) in parsed {
            if !self.dummy_electorates.contains(&id) { continue }

            let code = self.task.electorate_code(id);
            for area in self.changed_areas.iter_mut().filter(|area| area.dummy_electorate_id == code) {
                area.current_population = row.current_population;
                area.variance_year_1 = row.variance_year_1;
                area.variance_year_2 = row.variance_year_2;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
