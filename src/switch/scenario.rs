use std::collections::BTreeMap;

use coverage::{regions, union_coverage, UnionOptions};
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    control::TaskControl,
    district::DistrictStore,
    error::Result,
    map::MeshblockLayer,
    scenario::ScenarioRegistry,
    types::{ElectorateId, MeshblockNumber, ScenarioId, Task, Value},
};

/// Recomputed values for one electorate after a scenario switch.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectorateUpdate {
    pub electorate_id: ElectorateId,
    pub estimated_pop: i64,
    pub geometry: Option<MultiPolygon<f64>>,
    pub invalid: bool,
    pub invalid_reason: Option<String>,
}

/// Everything needed to recompute one electorate, gathered up front.
#[derive(Debug, Clone)]
struct ElectorateJob {
    id: ElectorateId,
    task: Task,
    expected_regions: Option<i64>,
    deprecated: bool,
    meshblocks: Vec<MeshblockNumber>,
}

/// Recomputes electorate populations, geometries and validity for the
/// meshblock assignments of one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioSwitchTask {
    scenario: ScenarioId,
    task: Option<Task>,
    options: UnionOptions,
    jobs: Vec<ElectorateJob>,
}

impl ScenarioSwitchTask {
    /// Collect the member meshblocks of every electorate of `task` (all
    /// tasks when `None`). Fails if an assigned meshblock is missing from
    /// the layer.
    pub fn new(
        registry: &ScenarioRegistry,
        districts: &DistrictStore,
        meshblocks: &MeshblockLayer,
        scenario: ScenarioId,
        task: Option<Task>,
        settings: &Settings,
    ) -> Result<Self> {
        let tasks = task.map_or(Task::ALL.to_vec(), |task| vec![task]);

        let mut members: BTreeMap<(Task, ElectorateId), Vec<MeshblockNumber>> = BTreeMap::new();
        for &task in &tasks {
            for (number, electorate) in registry.electorate_assignments(task, scenario)? {
                meshblocks.require(number)?;
                members.entry((task, electorate)).or_default().push(number);
            }
        }

        let mut jobs = Vec::new();
        for electorate in districts.electorates()? {
            if !tasks.contains(&electorate.task) { continue }
            jobs.push(ElectorateJob {
                id: electorate.id,
                task: electorate.task,
                expected_regions: electorate.expected_regions,
                deprecated: electorate.deprecated,
                meshblocks: members.remove(&(electorate.task, electorate.id)).unwrap_or_default(),
            });
        }
        for ((task, id), numbers) in &members {
            warn!("{} meshblocks assigned to unknown {task} electorate {id}", numbers.len());
        }

        Ok(Self { scenario, task, options: settings.union_options(), jobs })
    }

    #[inline] pub fn scenario(&self) -> ScenarioId { self.scenario }
    #[inline] pub fn task(&self) -> Option<Task> { self.task }

    /// Number of electorates this task will recompute.
    #[inline] pub fn len(&self) -> usize { self.jobs.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.jobs.is_empty() }

    /// Recompute every electorate in parallel.
    pub fn calculate_new_electorates(&self, meshblocks: &MeshblockLayer, control: &TaskControl) -> Result<Vec<ElectorateUpdate>> {
        control.check()?;
        let updates = self.jobs.par_iter()
            .map(|job| {
                control.check()?;
                self.calculate(job, meshblocks)
            })
            .collect::<Result<Vec<_>>>()?;
        control.check()?;
        control.set_progress(90.0);
        Ok(updates)
    }

    fn calculate(&self, job: &ElectorateJob, meshblocks: &MeshblockLayer) -> Result<ElectorateUpdate> {
        let members = job.meshblocks.iter()
            .map(|&number| meshblocks.require(number))
            .collect::<Result<Vec<_>>>()?;

        let estimated_pop: i64 = members.iter().filter_map(|m| m.offline_pop(job.task)).sum();

        let geometry = if members.is_empty() {
            None
        } else {
            let shapes = members.iter().map(|m| m.geometry.clone()).collect::<Vec<_>>();
            Some(union_coverage(&shapes, &self.options)?)
        };

        let mainland = members.iter().filter(|m| !m.offshore).collect::<Vec<_>>();
        let region_count = match &geometry {
            None => 0,
            Some(_) if mainland.is_empty() => 0,
            Some(merged) if mainland.len() == members.len() => regions(merged).len(),
            Some(_) => {
                let shapes = mainland.iter().map(|m| m.geometry.clone()).collect::<Vec<_>>();
                regions(&union_coverage(&shapes, &self.options)?).len()
            }
        };

        let invalid_reason = if members.is_empty() && !job.deprecated {
            Some("no meshblocks assigned".to_string())
        } else if !members.is_empty() && job.deprecated {
            Some("deprecated electorate has meshblocks assigned".to_string())
        } else {
            job.expected_regions
                .filter(|&expected| expected != region_count as i64)
                .map(|expected| format!("contiguity: {region_count} regions, expected {expected}"))
        };

        Ok(ElectorateUpdate {
            electorate_id: job.id,
            estimated_pop,
            geometry,
            invalid: invalid_reason.is_some(),
            invalid_reason,
        })
    }

    /// Calculate and apply in one step; returns the number of electorates updated.
    pub fn run(&self, meshblocks: &MeshblockLayer, districts: &mut DistrictStore, control: &TaskControl) -> Result<usize> {
        let updates = self.calculate_new_electorates(meshblocks, control)?;
        apply_electorate_updates(districts, &updates)?;
        control.set_progress(100.0);
        info!("switched to scenario {}: {} electorates updated", self.scenario, updates.len());
        Ok(updates.len())
    }
}

/// Write recomputed values into the district store and clear the
/// official statistics. Every electorate is resolved before anything is
/// written.
pub fn apply_electorate_updates(districts: &mut DistrictStore, updates: &[ElectorateUpdate]) -> Result<()> {
    let targets = updates.iter()
        .map(|update| districts.feature_id(update.electorate_id).map(|fid| (fid, update)))
        .collect::<Result<Vec<_>>>()?;

    let schema = *districts.schema();
    let table = districts.table_mut();
    for (fid, update) in targets {
        table.change_attribute_value(fid, schema.estimated_pop, Value::Int(update.estimated_pop))?;
        table.change_attribute_value(fid, schema.invalid, Value::Bool(update.invalid))?;
        table.change_attribute_value(fid, schema.invalid_reason, Value::from(update.invalid_reason.clone()))?;
        for field in [schema.stats_nz_pop, schema.stats_nz_var_20, schema.stats_nz_var_23] {
            table.change_attribute_value(fid, field, Value::Null)?;
        }
        table.change_geometry(fid, update.geometry.clone())?;
    }
    debug!("applied {} electorate updates", updates.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        district::Electorate,
        error::Error,
        map::{Crs, Meshblock},
        scenario::AssignmentRecord,
    };
    use geo::{coord, Rect};

    fn square(x0: f64, y0: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x0 + 1.0, y: y0 + 1.0 }).to_polygon()])
    }

    struct Fixture {
        registry: ScenarioRegistry,
        districts: DistrictStore,
        meshblocks: MeshblockLayer,
    }

    fn fixture() -> Fixture {
        let meshblocks = MeshblockLayer::new(Crs::NZTM, vec![
            Meshblock::new(MeshblockNumber(11), square(0.0, 0.0)).with_offline_pop(Task::GeneralNorth, 100),
            Meshblock::new(MeshblockNumber(12), square(1.0, 0.0)).with_offline_pop(Task::GeneralNorth, 50),
            Meshblock::new(MeshblockNumber(13), square(5.0, 0.0)).with_offline_pop(Task::GeneralNorth, 7),
            Meshblock::new(MeshblockNumber(14), square(9.0, 0.0)).with_offshore(true),
        ]).unwrap();

        let scenario = ScenarioId(1);
        let registry = ScenarioRegistry::from_parts(
            [(scenario, "one".to_string())],
            [
                AssignmentRecord::new(scenario, MeshblockNumber(11)).with_electorate(Task::GeneralNorth, ElectorateId(1)),
                AssignmentRecord::new(scenario, MeshblockNumber(12)).with_electorate(Task::GeneralNorth, ElectorateId(1)),
                AssignmentRecord::new(scenario, MeshblockNumber(13)).with_electorate(Task::GeneralNorth, ElectorateId(2)),
                AssignmentRecord::new(scenario, MeshblockNumber(14)).with_electorate(Task::GeneralNorth, ElectorateId(2)),
            ],
        ).unwrap();

        let mut districts = DistrictStore::empty();
        districts.add_electorate(&Electorate::new(ElectorateId(1), Task::GeneralNorth, "GN01", "One").with_expected_regions(1), None).unwrap();
        districts.add_electorate(&Electorate::new(ElectorateId(2), Task::GeneralNorth, "GN02", "Two").with_expected_regions(1), None).unwrap();
        districts.add_electorate(&Electorate::new(ElectorateId(3), Task::GeneralNorth, "GN03", "Three"), None).unwrap();
        districts.add_electorate(&Electorate::new(ElectorateId(4), Task::GeneralNorth, "GN04", "Four").with_deprecated(true), None).unwrap();
        districts.add_electorate(&Electorate::new(ElectorateId(5), Task::Maori, "M05", "Five"), None).unwrap();

        Fixture { registry, districts, meshblocks }
    }

    fn switch(f: &Fixture) -> ScenarioSwitchTask {
        ScenarioSwitchTask::new(&f.registry, &f.districts, &f.meshblocks, ScenarioId(1), Some(Task::GeneralNorth), &Settings::default()).unwrap()
    }

    #[test]
    fn only_selected_task_is_recomputed() {
        let f = fixture();
        assert_eq!(switch(&f).len(), 4);
        let all = ScenarioSwitchTask::new(&f.registry, &f.districts, &f.meshblocks, ScenarioId(1), None, &Settings::default()).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn populations_and_validity() {
        let f = fixture();
        let updates = switch(&f).calculate_new_electorates(&f.meshblocks, &TaskControl::new()).unwrap();
        let by_id = updates.into_iter().map(|u| (u.electorate_id, u)).collect::<BTreeMap<_, _>>();

        let one = &by_id[&ElectorateId(1)];
        assert_eq!(one.estimated_pop, 150);
        assert_eq!(one.geometry.as_ref().map(|g| g.0.len()), Some(1));
        assert!(!one.invalid);

        // The offshore meshblock does not count towards contiguity.
        let two = &by_id[&ElectorateId(2)];
        assert_eq!(two.estimated_pop, 7);
        assert!(!two.invalid, "{:?}", two.invalid_reason);

        let three = &by_id[&ElectorateId(3)];
        assert!(three.invalid);
        assert_eq!(three.geometry, None);
        assert_eq!(three.invalid_reason.as_deref(), Some("no meshblocks assigned"));

        let four = &by_id[&ElectorateId(4)];
        assert!(!four.invalid);
    }

    #[test]
    fn region_count_mismatch_is_invalid() {
        let mut f = fixture();
        f.registry.update_assignments(ScenarioId(1), Task::GeneralNorth, &BTreeMap::from([
            (MeshblockNumber(13), Some(ElectorateId(1))),
        ])).unwrap();
        let updates = switch(&f).calculate_new_electorates(&f.meshblocks, &TaskControl::new()).unwrap();
        let one = updates.iter().find(|u| u.electorate_id == ElectorateId(1)).unwrap();
        assert!(one.invalid);
        assert_eq!(one.invalid_reason.as_deref(), Some("contiguity: 2 regions, expected 1"));
    }

    #[test]
    fn deprecated_with_meshblocks_is_invalid() {
        let mut f = fixture();
        f.registry.update_assignments(ScenarioId(1), Task::GeneralNorth, &BTreeMap::from([
            (MeshblockNumber(13), Some(ElectorateId(4))),
        ])).unwrap();
        let updates = switch(&f).calculate_new_electorates(&f.meshblocks, &TaskControl::new()).unwrap();
        let four = updates.iter().find(|u| u.electorate_id == ElectorateId(4)).unwrap();
        assert_eq!(four.invalid_reason.as_deref(), Some("deprecated electorate has meshblocks assigned"));
    }

    #[test]
    fn run_writes_store_and_clears_stats() {
        let mut f = fixture();
        let fid = f.districts.feature_id(ElectorateId(1)).unwrap();
        let stats = f.districts.schema().stats_nz_pop;
        f.districts.table_mut().change_attribute_value(fid, stats, Value::Int(99)).unwrap();

        let task = switch(&f);
        assert_eq!(task.run(&f.meshblocks, &mut f.districts, &TaskControl::new()).unwrap(), 4);

        let one = f.districts.electorate(ElectorateId(1)).unwrap();
        assert_eq!(one.estimated_pop, Some(150));
        assert_eq!(one.stats_nz_pop, None);
        assert!(f.districts.geometry(ElectorateId(1)).unwrap().is_some());
        assert!(f.districts.electorate(ElectorateId(3)).unwrap().invalid);
    }

    #[test]
    fn missing_meshblock_is_a_consistency_error() {
        let mut f = fixture();
        f.registry.add_assignment(
            AssignmentRecord::new(ScenarioId(1), MeshblockNumber(99)).with_electorate(Task::GeneralNorth, ElectorateId(1))
        ).unwrap();
        let result = ScenarioSwitchTask::new(&f.registry, &f.districts, &f.meshblocks, ScenarioId(1), Some(Task::GeneralNorth), &Settings::default());
        assert!(matches!(result, Err(Error::DataConsistency(_))));
    }

    #[test]
    fn canceled_run_leaves_store_unchanged() {
        let mut f = fixture();
        let before = f.districts.electorates().unwrap();
        let control = TaskControl::new();
        control.cancel();
        let task = switch(&f);
        assert!(matches!(task.run(&f.meshblocks, &mut f.districts, &control), Err(Error::Canceled)));
        assert_eq!(f.districts.electorates().unwrap(), before);
    }

    #[test]
    fn unknown_electorate_update_writes_nothing() {
        let mut f = fixture();
        let before = f.districts.electorates().unwrap();
        let updates = vec![
            ElectorateUpdate { electorate_id: ElectorateId(1), estimated_pop: 5, geometry: None, invalid: false, invalid_reason: None },
            ElectorateUpdate { electorate_id: ElectorateId(42), estimated_pop: 5, geometry: None, invalid: false, invalid_reason: None },
        ];
        assert!(matches!(apply_electorate_updates(&mut f.districts, &updates), Err(Error::UnknownElectorate(ElectorateId(42)))));
        assert_eq!(f.districts.electorates().unwrap(), before);
    }
}
