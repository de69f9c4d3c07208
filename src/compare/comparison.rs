use std::collections::{BTreeMap, BTreeSet};

use coverage::{point_on_surface, regions, union_coverage, PreparedIndex, UnionOptions};
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    compare::{ChangedArea, ChangedMeshblock, ComparisonOutput, DummyPool},
    concordance::ConcordanceItem,
    config::Settings,
    control::TaskControl,
    error::{Error, Result},
    map::{MeshblockLayer, ReferencedRect},
    scenario::ScenarioRegistry,
    types::{ElectorateId, MeshblockNumber, ScenarioId, Task},
};

/// Which two scenarios to compare, for which task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRequest {
    pub task: Task,
    pub base_scenario: ScenarioId,
    pub secondary_scenario: ScenarioId,
    /// Only used to narrow the changed areas when there are more than dummy ids.
    pub extent: Option<ReferencedRect>,
}

/// A connected area of meshblocks moving from one electorate to another.
struct Patch {
    from: ElectorateId,
    to: ElectorateId,
    geometry: MultiPolygon<f64>,
}

/// A scenario comparison, configured and ready to run.
#[derive(Debug, Clone)]
pub struct ComparisonTask {
    request: ComparisonRequest,
    options: UnionOptions,
    dummy_pool_max: i64,
    worker_threads: usize,
}

impl ComparisonTask {
    pub fn new(request: ComparisonRequest, settings: &Settings) -> Self {
        Self {
            request,
            options: settings.union_options(),
            dummy_pool_max: settings.dummy_pool_max,
            worker_threads: settings.worker_threads,
        }
    }

    #[inline] pub fn request(&self) -> &ComparisonRequest { &self.request }

    /// Run the comparison to completion, on a dedicated rayon pool when
    /// a worker count is configured.
    pub fn run(&self, registry: &ScenarioRegistry, meshblocks: &MeshblockLayer, control: &TaskControl) -> Result<ComparisonOutput> {
        if self.worker_threads == 0 { return self.execute(registry, meshblocks, control) }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .build()
            .map_err(|e| Error::Worker(e.to_string()))?;
        pool.install(|| self.execute(registry, meshblocks, control))
    }

    fn execute(&self, registry: &ScenarioRegistry, meshblocks: &MeshblockLayer, control: &TaskControl) -> Result<ComparisonOutput> {
        let ComparisonRequest { task, base_scenario, secondary_scenario, extent } = self.request;
        for id in [base_scenario, secondary_scenario] {
            if !registry.scenario_exists(id) { return Err(Error::UnknownScenario(id)) }
        }

        // ---- Partition assignments by scenario ----
        let mut base = BTreeMap::new();
        let mut secondary = BTreeMap::new();
        for record in registry.meshblocks_for_scenarios(&[base_scenario, secondary_scenario]) {
            let Some(electorate) = record.electorate(task) else { continue };
            if record.scenario_id == base_scenario {
                base.insert(record.meshblock_number, electorate);
            } else if record.scenario_id == secondary_scenario {
                secondary.insert(record.meshblock_number, electorate);
            } else {
                return Err(Error::consistency(format!("assignment row belongs to scenario {}", record.scenario_id)))
            }
        }
        if base_scenario == secondary_scenario { secondary = base.clone() }
        control.check()?;
        control.set_progress(10.0);

        if let Some(missing) = base.keys().chain(secondary.keys()).find(|number| !meshblocks.contains(**number)) {
            return Err(Error::consistency(format!("meshblock {missing} is assigned but not in the meshblock layer")))
        }

        // ---- Changed meshblocks ----
        let mut output = ComparisonOutput::empty(task);
        let mut moves: BTreeMap<MeshblockNumber, (ElectorateId, ElectorateId)> = BTreeMap::new();
        let mut unchanged = BTreeSet::new();
        for (&number, &from) in &base {
            match secondary.get(&number) {
                Some(&to) if to == from => { unchanged.insert(from); }
                Some(&to) => {
                    output.changed.insert(number);
                    moves.insert(number, (from, to));
                }
                None => {
                    output.changed.insert(number);
                    output.unassigned.push(number);
                }
            }
        }
        output.base_electorates = base;
        output.secondary_electorates = secondary;
        debug!("{} meshblocks changed between scenarios {base_scenario} and {secondary_scenario}", output.changed.len());

        // ---- Union each (from, to) group ----
        let mut groups: BTreeMap<(ElectorateId, ElectorateId), Vec<MeshblockNumber>> = BTreeMap::new();
        for (&number, &key) in &moves {
            groups.entry(key).or_default().push(number);
        }
        let groups = groups.into_iter().collect::<Vec<_>>();

        let merged = groups.par_iter()
            .map(|((from, to), members)| {
                control.check()?;
                let shapes = members.iter()
                    .map(|&number| meshblocks.require(number).map(|m| m.geometry.clone()))
                    .collect::<Result<Vec<_>>>()?;
                let union = union_coverage(&shapes, &self.options)?;
                Ok(regions(&union).into_iter()
                    .map(|polygon| Patch { from: *from, to: *to, geometry: MultiPolygon(vec![polygon]) })
                    .collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>>>()?;
        let mut patches = merged.into_iter().flatten().collect::<Vec<_>>();
        control.check()?;
        control.set_progress(60.0);

        // ---- Dummy electorates ----
        let pool = DummyPool::new(self.dummy_pool_max, &unchanged);
        if patches.len() > pool.len() {
            if let Some(extent) = extent {
                let bounds = extent.transform_to(meshblocks.crs())?;
                let before = patches.len();
                let hits = PreparedIndex::new(patches.iter().map(|patch| patch.geometry.clone()).collect())
                    .intersecting(&bounds);
                patches = patches.into_iter().enumerate()
                    .filter(|(i, _)| hits.binary_search(i).is_ok())
                    .map(|(_, patch)| patch)
                    .collect();
                debug!("extent kept {} of {before} changed areas", patches.len());
            }
            if patches.len() > pool.len() {
                return Err(Error::CapacityExceeded { needed: patches.len(), available: pool.len() })
            }
        }

        let dummies = pool.ids().zip(patches).collect::<Vec<_>>();
        let index = PreparedIndex::new(dummies.iter().map(|(_, patch)| patch.geometry.clone()).collect());
        control.set_progress(70.0);

        // ---- Locate each moved meshblock in its area ----
        for (&number, &(from, to)) in &moves {
            let meshblock = meshblocks.require(number)?;
            let Some(slot) = point_on_surface(&meshblock.geometry).and_then(|point| index.locate(point)) else {
                warn!("meshblock {number} is outside every changed area, skipping");
                output.skipped.push(number);
                continue
            };
            let dummy = dummies[slot].0;
            output.changed_meshblocks.push(ChangedMeshblock {
                meshblock_number: number.formatted(),
                previous_electorate_id: from,
                new_electorate_id: to,
                previous_electorate: task.electorate_code(from),
                new_electorate: task.electorate_code(to),
                dummy_electorate: ComparisonOutput::dummy_label(dummy),
                geometry: meshblock.geometry.clone(),
            });
            output.concordance.push(ConcordanceItem::new(&number.to_string(), &dummy.to_string(), task));
        }
        control.check()?;
        control.set_progress(90.0);

        for (dummy, patch) in dummies {
            output.dummy_electorates.push(dummy);
            output.changed_areas.push(ChangedArea {
                dummy_electorate_id: task.electorate_code(dummy),
                previous_electorate: task.electorate_code(patch.from),
                new_electorate: task.electorate_code(patch.to),
                current_population: None,
                variance_year_1: None,
                variance_year_2: None,
                geometry: patch.geometry,
            });
        }
        control.set_progress(100.0);

        info!(
            "compared scenarios {base_scenario} and {secondary_scenario} for {task}: {} changed meshblocks in {} areas",
            output.changed_meshblocks.len(), output.changed_areas.len(),
        );
        Ok(output)
    }
}

/// Compare two scenarios on the calling thread.
pub fn compare_scenarios(
    registry: &ScenarioRegistry,
    meshblocks: &MeshblockLayer,
    request: ComparisonRequest,
    settings: &Settings,
    control: &TaskControl,
) -> Result<ComparisonOutput> {
    ComparisonTask::new(request, settings).run(registry, meshblocks, control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        map::{Crs, Meshblock},
        scenario::AssignmentRecord,
    };
    use geo::{coord, Rect};

    fn square(x0: f64, x1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: x0, y: 0.0 }, coord! { x: x1, y: 1.0 }).to_polygon()])
    }

    fn layer() -> MeshblockLayer {
        MeshblockLayer::new(Crs::NZTM, vec![
            Meshblock::new(MeshblockNumber(11), square(0.0, 1.0)),
            Meshblock::new(MeshblockNumber(12), square(1.0, 2.0)),
            Meshblock::new(MeshblockNumber(13), square(11.0, 12.0)),
        ]).unwrap()
    }

    fn registry(rows: &[(i64, u32, i64)]) -> ScenarioRegistry {
        ScenarioRegistry::from_parts(
            [(ScenarioId(1), "one".to_string()), (ScenarioId(2), "two".to_string())],
            rows.iter().map(|&(scenario, mb, gn)| {
                AssignmentRecord::new(ScenarioId(scenario), MeshblockNumber(mb)).with_electorate(Task::GeneralNorth, ElectorateId(gn))
            }),
        ).unwrap()
    }

    fn request() -> ComparisonRequest {
        ComparisonRequest { task: Task::GeneralNorth, base_scenario: ScenarioId(1), secondary_scenario: ScenarioId(2), extent: None }
    }

    fn run(registry: &ScenarioRegistry, settings: &Settings) -> Result<ComparisonOutput> {
        compare_scenarios(registry, &layer(), request(), settings, &TaskControl::new())
    }

    #[test]
    fn identical_scenarios_have_no_changes() {
        let registry = registry(&[(1, 11, 1), (1, 12, 3), (2, 11, 1), (2, 12, 3)]);
        let output = run(&registry, &Settings::default()).unwrap();
        assert!(output.changed.is_empty());
        assert!(output.changed_meshblocks.is_empty());
        assert!(output.changed_areas.is_empty());
        assert!(output.concordance.is_empty());
    }

    #[test]
    fn groups_by_electorate_pair() {
        let registry = registry(&[(1, 11, 1), (1, 12, 3), (2, 11, 2), (2, 12, 9)]);
        let output = run(&registry, &Settings::default()).unwrap();
        let records = output.changed_meshblocks.iter()
            .map(|r| (r.meshblock_number.as_str(), r.previous_electorate_id.0, r.new_electorate_id.0, r.dummy_electorate.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(records, vec![("0000011", 1, 2, "D01"), ("0000012", 3, 9, "D02")]);
        assert_eq!(output.changed_meshblocks[0].previous_electorate, "GN01");
        assert_eq!(output.changed_areas.len(), 2);
        assert_eq!(output.changed_areas[1].dummy_electorate_id, "GN02");
        assert_eq!(output.concordance[1], ConcordanceItem::new("12", "2", Task::GeneralNorth));
        assert_eq!(output.concordance[1].electorate, "N02");
    }

    #[test]
    fn disjoint_parts_get_separate_dummies() {
        let registry = registry(&[(1, 11, 4), (1, 12, 4), (1, 13, 4), (2, 11, 7), (2, 12, 4), (2, 13, 7)]);
        let output = run(&registry, &Settings::default()).unwrap();
        assert_eq!(output.changed, BTreeSet::from([MeshblockNumber(11), MeshblockNumber(13)]));
        // Electorate 4 is unchanged, so the pool starts 1, 2, 3, 5.
        let labels = output.changed_meshblocks.iter().map(|r| r.dummy_electorate.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["D01", "D02"]);
    }

    #[test]
    fn unchanged_electorates_are_never_dummies() {
        let registry = registry(&[(1, 11, 1), (1, 12, 5), (2, 11, 2), (2, 12, 5)]);
        let mut settings = Settings::default();
        settings.dummy_pool_max = 5;
        let output = run(&registry, &settings).unwrap();
        assert!(!output.dummy_electorates.contains(&ElectorateId(5)));
    }

    #[test]
    fn capacity_is_enforced() {
        let registry = registry(&[(1, 11, 1), (1, 12, 3), (2, 11, 2), (2, 12, 9)]);
        let mut settings = Settings::default();
        settings.dummy_pool_max = 1;
        assert!(matches!(
            run(&registry, &settings),
            Err(Error::CapacityExceeded { needed: 2, available: 1 })
        ));
    }

    #[test]
    fn pool_stops_at_two_digit_codes() {
        let layer = MeshblockLayer::new(Crs::NZTM, (0..101)
            .map(|i| Meshblock::new(MeshblockNumber(100 + i), square(2.0 * i as f64, 2.0 * i as f64 + 1.0)))
            .collect()
        ).unwrap();
        let registry = registry(&(0..101)
            .flat_map(|i| [(1, 100 + i, 1), (2, 100 + i, 2)])
            .collect::<Vec<(i64, u32, i64)>>());
        let mut settings = Settings::default();
        settings.dummy_pool_max = 150;
        let result = compare_scenarios(&registry, &layer, request(), &settings, &TaskControl::new());
        assert!(matches!(result, Err(Error::CapacityExceeded { needed: 101, available: 99 })));
    }

    #[test]
    fn extent_narrows_areas_and_skips_the_rest() {
        let registry = registry(&[(1, 11, 1), (1, 13, 3), (2, 11, 2), (2, 13, 9)]);
        let mut settings = Settings::default();
        settings.dummy_pool_max = 1;
        let mut request = request();
        request.extent = Some(ReferencedRect::new(Rect::new(coord! { x: 10.0, y: -1.0 }, coord! { x: 13.0, y: 2.0 }), Crs::NZTM));
        let output = compare_scenarios(&registry, &layer(), request, &settings, &TaskControl::new()).unwrap();
        assert_eq!(output.changed_meshblocks.len(), 1);
        assert_eq!(output.changed_meshblocks[0].meshblock_number, "0000013");
        assert_eq!(output.skipped, vec![MeshblockNumber(11)]);
        assert_eq!(output.concordance.len(), 1);
    }

    #[test]
    fn missing_meshblock_is_a_consistency_error() {
        let registry = registry(&[(1, 11, 1), (1, 99, 3), (2, 11, 2)]);
        assert!(matches!(run(&registry, &Settings::default()), Err(Error::DataConsistency(_))));
    }

    #[test]
    fn unassigned_in_secondary_is_reported() {
        let registry = registry(&[(1, 11, 1), (1, 12, 3), (2, 11, 2)]);
        let output = run(&registry, &Settings::default()).unwrap();
        assert_eq!(output.unassigned, vec![MeshblockNumber(12)]);
        assert!(output.changed.contains(&MeshblockNumber(12)));
        assert_eq!(output.changed_meshblocks.len(), 1);
    }

    #[test]
    fn canceled_run_produces_nothing() {
        let registry = registry(&[(1, 11, 1), (2, 11, 2)]);
        let control = TaskControl::new();
        control.cancel();
        let result = compare_scenarios(&registry, &layer(), request(), &Settings::default(), &control);
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[test]
    fn unknown_scenario_fails() {
        let registry = registry(&[]);
        let mut request = request();
        request.secondary_scenario = ScenarioId(42);
        let result = compare_scenarios(&registry, &layer(), request, &Settings::default(), &TaskControl::new());
        assert!(matches!(result, Err(Error::UnknownScenario(ScenarioId(42)))));
    }

    #[test]
    fn dedicated_pool_gives_same_result() {
        let registry = registry(&[(1, 11, 1), (1, 12, 3), (2, 11, 2), (2, 12, 9)]);
        let mut settings = Settings::default();
        settings.worker_threads = 2;
        assert_eq!(run(&registry, &settings).unwrap(), run(&registry, &Settings::default()).unwrap());
    }
}
