use tracing::debug;

use crate::{
    control::TaskControl,
    error::Result,
    map::MeshblockSchema,
    scenario::ScenarioRegistry,
    store::FeatureTable,
    types::{MeshblockNumber, ScenarioId, Task, Value},
};

/// Copies a scenario's electorates for one task into the staged electorate
/// attribute of the meshblock table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStagedElectoratesTask {
    scenario: ScenarioId,
    task: Task,
}

impl UpdateStagedElectoratesTask {
    pub fn new(scenario: ScenarioId, task: Task) -> Self { Self { scenario, task } }

    /// Write staged electorates, touching only values that differ.
    /// Meshblocks without an assignment are set to null. Returns the number
    /// of meshblocks changed; nothing is written if canceled.
    pub fn run(&self, registry: &ScenarioRegistry, table: &mut FeatureTable, control: &TaskControl) -> Result<usize> {
        let schema = MeshblockSchema::resolve(table)?;
        let assignments = registry.electorate_assignments(self.task, self.scenario)?;

        let total = table.len().max(1);
        let mut changes = Vec::new();
        for (i, (fid, feature)) in table.features().enumerate() {
            let number = match &feature.attributes[schema.meshblock_number] {
                Value::Text(text) => text.parse::<MeshblockNumber>().ok(),
                value => value.as_i64().and_then(|n| u32::try_from(n).ok()).map(MeshblockNumber),
            };
            let staged = number
                .and_then(|number| assignments.get(&number))
                .map_or(Value::Null, |electorate| Value::Int(electorate.0));
            if feature.attributes[schema.staged_electorate] != staged {
                changes.push((fid, staged));
            }
            if i % 1024 == 0 {
                control.check()?;
                control.set_progress(80.0 * i as f64 / total as f64);
            }
        }
        control.check()?;

        let changed = changes.len();
        for (fid, staged) in changes {
            table.change_attribute_value(fid, schema.staged_electorate, staged)?;
        }
        control.set_progress(100.0);
        debug!("staged electorates for scenario {} ({}): {changed} changed", self.scenario, self.task);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, scenario::AssignmentRecord, types::{ElectorateId, FeatureId}};

    fn table() -> FeatureTable {
        let mut table = FeatureTable::new("meshblocks", MeshblockSchema::FIELDS);
        table.add_feature(vec![Value::from("0000011"), Value::Int(1)], None);
        table.add_feature(vec![Value::from("0000012"), Value::Int(1)], None);
        table.add_feature(vec![Value::from("0000013"), Value::Int(1)], None);
        table
    }

    fn registry() -> ScenarioRegistry {
        ScenarioRegistry::from_parts(
            [(ScenarioId(1), "one".to_string())],
            [
                AssignmentRecord::new(ScenarioId(1), MeshblockNumber(11)).with_electorate(Task::GeneralNorth, ElectorateId(1)),
                AssignmentRecord::new(ScenarioId(1), MeshblockNumber(12)).with_electorate(Task::GeneralNorth, ElectorateId(2)),
            ],
        ).unwrap()
    }

    #[test]
    fn writes_only_differences() {
        let mut table = table();
        let task = UpdateStagedElectoratesTask::new(ScenarioId(1), Task::GeneralNorth);
        assert_eq!(task.run(&registry(), &mut table, &TaskControl::new()).unwrap(), 2);
        assert_eq!(table.attribute(FeatureId(0), 1), Some(&Value::Int(1)));
        assert_eq!(table.attribute(FeatureId(1), 1), Some(&Value::Int(2)));
        assert_eq!(table.attribute(FeatureId(2), 1), Some(&Value::Null));

        assert_eq!(task.run(&registry(), &mut table, &TaskControl::new()).unwrap(), 0);
    }

    #[test]
    fn canceled_run_writes_nothing() {
        let mut table = table();
        let control = TaskControl::new();
        control.cancel();
        let task = UpdateStagedElectoratesTask::new(ScenarioId(1), Task::GeneralNorth);
        assert!(matches!(task.run(&registry(), &mut table, &control), Err(Error::Canceled)));
        assert_eq!(table.attribute(FeatureId(1), 1), Some(&Value::Int(1)));
    }
}
