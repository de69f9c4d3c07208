use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::{ElectorateId, MeshblockNumber, ScenarioId, Task},
};

/// The electorates a meshblock belongs to under one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub scenario_id: ScenarioId,
    pub meshblock_number: MeshblockNumber,
    pub gn_id: Option<ElectorateId>,
    pub gs_id: Option<ElectorateId>,
    pub m_id: Option<ElectorateId>,
}

impl AssignmentRecord {
    pub fn new(scenario_id: ScenarioId, meshblock_number: MeshblockNumber) -> Self {
        Self { scenario_id, meshblock_number, gn_id: None, gs_id: None, m_id: None }
    }

    /// Electorate of type `task`, if assigned.
    pub fn electorate(&self, task: Task) -> Option<ElectorateId> {
        match task {
            Task::GeneralNorth => self.gn_id,
            Task::GeneralSouth => self.gs_id,
            Task::Maori => self.m_id,
        }
    }

    pub fn set_electorate(&mut self, task: Task, electorate: Option<ElectorateId>) {
        match task {
            Task::GeneralNorth => self.gn_id = electorate,
            Task::GeneralSouth => self.gs_id = electorate,
            Task::Maori => self.m_id = electorate,
        }
    }

    pub fn with_electorate(mut self, task: Task, electorate: ElectorateId) -> Self {
        self.set_electorate(task, Some(electorate));
        self
    }
}

/// Named scenarios and their meshblock assignments.
///
/// Each scenario holds at most one assignment per meshblock, and scenario
/// names are unique.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    names: BTreeMap<ScenarioId, String>,
    assignments: BTreeMap<ScenarioId, BTreeMap<MeshblockNumber, AssignmentRecord>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self { Self::default() }

    /// Build a registry from stored scenarios and assignment rows.
    pub fn from_parts(
        scenarios: impl IntoIterator<Item = (ScenarioId, String)>,
        assignments: impl IntoIterator<Item = AssignmentRecord>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for (id, name) in scenarios {
            registry.add_scenario(id, &name)?;
        }
        for record in assignments {
            registry.add_assignment(record)?;
        }
        Ok(registry)
    }

    /// Register a scenario. Ids and names must be unused.
    pub fn add_scenario(&mut self, id: ScenarioId, name: &str) -> Result<()> {
        if self.scenario_id(name).is_some() {
            return Err(Error::NameConflict(name.to_string()))
        }
        if self.names.contains_key(&id) {
            return Err(Error::consistency(format!("scenario id {id} is already in use")))
        }
        self.names.insert(id, name.to_string());
        self.assignments.insert(id, BTreeMap::new());
        Ok(())
    }

    /// Add one assignment row for an existing scenario.
    pub fn add_assignment(&mut self, record: AssignmentRecord) -> Result<()> {
        let rows = self.assignments.get_mut(&record.scenario_id)
            .ok_or(Error::UnknownScenario(record.scenario_id))?;
        if rows.contains_key(&record.meshblock_number) {
            return Err(Error::consistency(format!(
                "meshblock {} is assigned twice in scenario {}", record.meshblock_number, record.scenario_id
            )))
        }
        rows.insert(record.meshblock_number, record);
        Ok(())
    }

    #[inline] pub fn scenario_exists(&self, id: ScenarioId) -> bool { self.names.contains_key(&id) }

    #[inline] pub fn scenario_name(&self, id: ScenarioId) -> Option<&str> { self.names.get(&id).map(String::as_str) }

    pub fn scenario_id(&self, name: &str) -> Option<ScenarioId> {
        self.names.iter().find(|(_, n)| n.as_str() == name).map(|(&id, _)| id)
    }

    /// Iterate over `(id, name)` pairs in id order.
    pub fn scenarios(&self) -> impl Iterator<Item = (ScenarioId, &str)> {
        self.names.iter().map(|(&id, name)| (id, name.as_str()))
    }

    fn require(&self, id: ScenarioId) -> Result<&BTreeMap<MeshblockNumber, AssignmentRecord>> {
        self.assignments.get(&id).ok_or(Error::UnknownScenario(id))
    }

    /// Assignment rows of one scenario, ordered by meshblock number.
    pub fn assignments(&self, id: ScenarioId) -> Result<impl Iterator<Item = &AssignmentRecord>> {
        Ok(self.require(id)?.values())
    }

    /// All assignment rows belonging to any of `ids`, scenario by scenario.
    pub fn meshblocks_for_scenarios<'a>(&'a self, ids: &'a [ScenarioId]) -> impl Iterator<Item = &'a AssignmentRecord> {
        let ids = ids.iter().copied().collect::<BTreeSet<_>>();
        ids.into_iter()
            .filter_map(|id| self.assignments.get(&id))
            .flat_map(BTreeMap::values)
    }

    /// Meshblocks assigned to `electorate` (of type `task`) in `scenario`.
    pub fn electorate_meshblocks(&self, electorate: ElectorateId, task: Task, scenario: ScenarioId) -> Result<Vec<MeshblockNumber>> {
        Ok(self.require(scenario)?.values()
            .filter(|record| record.electorate(task) == Some(electorate))
            .map(|record| record.meshblock_number)
            .collect())
    }

    /// Meshblock to electorate map for one type in one scenario; unassigned meshblocks are omitted.
    pub fn electorate_assignments(&self, task: Task, scenario: ScenarioId) -> Result<BTreeMap<MeshblockNumber, ElectorateId>> {
        Ok(self.require(scenario)?.values()
            .filter_map(|record| record.electorate(task).map(|e| (record.meshblock_number, e)))
            .collect())
    }

    fn next_id(&self) -> ScenarioId {
        self.names.last_key_value().map_or(ScenarioId(1), |(id, _)| ScenarioId(id.0 + 1))
    }

    /// Create a scenario named `name` holding copies of `source`'s assignments.
    pub fn branch_scenario(&mut self, source: ScenarioId, name: &str) -> Result<ScenarioId> {
        let rows = self.require(source)?.values().cloned().collect::<Vec<_>>();
        self.insert_copy(name, rows)
    }

    /// Copy scenario `source` from another registry into this one as `name`.
    pub fn import_scenario(&mut self, other: &ScenarioRegistry, source: ScenarioId, name: &str) -> Result<ScenarioId> {
        let rows = other.require(source)?.values().cloned().collect::<Vec<_>>();
        self.insert_copy(name, rows)
    }

    fn insert_copy(&mut self, name: &str, rows: Vec<AssignmentRecord>) -> Result<ScenarioId> {
        let id = self.next_id();
        self.add_scenario(id, name)?;
        let target = self.assignments.entry(id).or_default();
        for mut record in rows {
            record.scenario_id = id;
            target.insert(record.meshblock_number, record);
        }
        Ok(id)
    }

    /// Overwrite the `task` electorate of several meshblocks in `scenario`.
    /// Every meshblock must already have a row; nothing changes otherwise.
    pub fn update_assignments(&mut self, scenario: ScenarioId, task: Task, changes: &BTreeMap<MeshblockNumber, Option<ElectorateId>>) -> Result<()> {
        let rows = self.assignments.get_mut(&scenario).ok_or(Error::UnknownScenario(scenario))?;
        if let Some(missing) = changes.keys().find(|number| !rows.contains_key(number)) {
            return Err(Error::consistency(format!("meshblock {missing} has no assignment in scenario {scenario}")))
        }
        for (number, electorate) in changes {
            if let Some(record) = rows.get_mut(number) {
                record.set_electorate(task, *electorate);
            }
        }
        Ok(())
    }
}
