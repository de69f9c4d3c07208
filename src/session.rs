use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info};

use crate::{
    compare::{spawn_comparison, ComparisonHandle, ComparisonRequest},
    concordance::{ConcordanceItem, PopulationRow},
    config::Settings,
    control::TaskControl,
    district::{DistrictRegistry, DistrictStore},
    edit::{AuditLog, ElectorateEditQueue},
    error::{Error, Result},
    map::{MeshblockLayer, MeshblockSchema},
    redistrict::{ElectorateRedistrictHandler, RedistrictStores},
    scenario::ScenarioRegistry,
    store::{EditBuffer, FeatureEditor, FeatureTable},
    switch::{apply_electorate_updates, ScenarioSwitchTask, UpdateStagedElectoratesTask},
    types::{ElectorateId, MeshblockNumber, ScenarioId, Task},
};

/// Everything an interactive redistricting session works on.
///
/// The session owns the stores and passes them by reference to the
/// individual tasks. The scenario registry and meshblock layer are shared
/// snapshots so comparisons can run on a background thread while editing
/// continues; committing an edit session replaces the registry snapshot
/// rather than mutating one a comparison is reading.
#[derive(Debug)]
pub struct RedistrictingSession {
    settings: Settings,
    registry: Arc<ScenarioRegistry>,
    meshblocks: Arc<MeshblockLayer>,
    buffer: EditBuffer,
    schema: MeshblockSchema,
    districts: DistrictStore,
    quotas: DistrictRegistry,
    queue: ElectorateEditQueue,
    audit: AuditLog,
    scenario: ScenarioId,
    task: Task,
}

impl RedistrictingSession {
    /// Open a session on `scenario` and `task`, staging the scenario's
    /// electorates and recomputing every electorate of the task.
    pub fn new(
        settings: Settings,
        registry: ScenarioRegistry,
        meshblocks: MeshblockLayer,
        districts: DistrictStore,
        quotas: DistrictRegistry,
        scenario: ScenarioId,
        task: Task,
    ) -> Result<Self> {
        let table = meshblocks.attribute_table();
        let schema = MeshblockSchema::resolve(&table)?;
        let mut session = Self {
            queue: ElectorateEditQueue::new(settings.queue_capacity),
            settings,
            registry: Arc::new(registry),
            meshblocks: Arc::new(meshblocks),
            buffer: EditBuffer::new(table),
            schema,
            districts,
            quotas,
            audit: AuditLog::new(),
            scenario,
            task,
        };
        session.activate(scenario, task, &TaskControl::new())?;
        Ok(session)
    }

    #[inline] pub fn settings(&self) -> &Settings { &self.settings }
    #[inline] pub fn registry(&self) -> &ScenarioRegistry { &self.registry }
    #[inline] pub fn meshblocks(&self) -> &MeshblockLayer { &self.meshblocks }
    #[inline] pub fn meshblock_table(&self) -> &FeatureTable { self.buffer.table() }
    #[inline] pub fn districts(&self) -> &DistrictStore { &self.districts }
    #[inline] pub fn district_registry(&self) -> &DistrictRegistry { &self.quotas }
    #[inline] pub fn queue(&self) -> &ElectorateEditQueue { &self.queue }
    #[inline] pub fn audit(&self) -> &AuditLog { &self.audit }
    #[inline] pub fn scenario(&self) -> ScenarioId { self.scenario }
    #[inline] pub fn task(&self) -> Task { self.task }

    /// Shared snapshot of the registry, for work outside the session.
    #[inline] pub fn registry_snapshot(&self) -> Arc<ScenarioRegistry> { Arc::clone(&self.registry) }

    // ---- Editing ----

    #[inline] pub fn is_editing(&self) -> bool { self.buffer.is_editing() }

    /// Whether there are uncommitted meshblock edits.
    #[inline] pub fn is_modified(&self) -> bool { self.buffer.is_modified() }

    pub fn start_editing(&mut self) { self.buffer.start_editing() }

    /// Staged electorate of a meshblock, including uncommitted edits.
    pub fn staged_electorate(&self, number: MeshblockNumber) -> Option<ElectorateId> {
        let fid = self.meshblocks.feature_id(number)?;
        self.buffer.table().attribute(fid, self.schema.staged_electorate)
            .and_then(|value| value.as_i64())
            .map(ElectorateId)
    }

    /// Move meshblocks to `electorate` as one undoable step.
    pub fn redistrict(&mut self, numbers: &[MeshblockNumber], electorate: ElectorateId) -> Result<()> {
        let targets = numbers.iter()
            .map(|&number| self.meshblocks.feature_id(number)
                .ok_or_else(|| Error::consistency(format!("meshblock {number} is not in the meshblock layer"))))
            .collect::<Result<Vec<_>>>()?;

        let handler = ElectorateRedistrictHandler::new(
            self.schema.staged_electorate,
            &self.settings.username,
            self.scenario,
            self.task,
            self.settings.union_options(),
        );
        let stores = RedistrictStores {
            meshblocks: &self.meshblocks,
            districts: &mut self.districts,
            audit: &mut self.audit,
            queue: &mut self.queue,
        };
        handler.assign_district(&mut self.buffer, &targets, electorate, stores)
    }

    /// Undo the last meshblock edit and bring the electorates in line.
    pub fn undo(&mut self) -> bool {
        if !self.buffer.undo() { return false }
        self.sync_queue();
        true
    }

    /// Redo the last undone meshblock edit and bring the electorates in line.
    pub fn redo(&mut self) -> bool {
        if !self.buffer.redo() { return false }
        self.sync_queue();
        true
    }

    fn sync_queue(&mut self) {
        let index = self.buffer.undo_index();
        self.queue.sync_to_external_index(self.districts.table_mut(), &mut self.audit, index);
    }

    /// Net staged electorate changes not yet committed, by meshblock.
    pub fn new_electorates(&self) -> Result<BTreeMap<MeshblockNumber, Option<ElectorateId>>> {
        let mut changes = BTreeMap::new();
        for (fid, fields) in self.buffer.pending_changes() {
            let Some(value) = fields.get(&self.schema.staged_electorate) else { continue };
            let meshblock = self.meshblocks.feature(fid).ok_or(Error::UnknownFeature(fid))?;
            changes.insert(meshblock.number, value.as_i64().map(ElectorateId));
        }
        Ok(changes)
    }

    /// Write pending edits into the active scenario and end the edit
    /// session. Returns the number of meshblocks whose assignment changed.
    pub fn commit(&mut self) -> Result<usize> {
        let changes = self.new_electorates()?;
        if !changes.is_empty() {
            Arc::make_mut(&mut self.registry).update_assignments(self.scenario, self.task, &changes)?;
        }
        self.buffer.commit();
        self.queue.clear();
        info!("committed {} meshblock assignments to scenario {}", changes.len(), self.scenario);
        Ok(changes.len())
    }

    /// Revert every uncommitted edit, in both the meshblocks and the electorates.
    pub fn rollback(&mut self) {
        self.queue.rollback(self.districts.table_mut(), &mut self.audit);
        self.buffer.rollback();
        debug!("rolled back edit session on scenario {}", self.scenario);
    }

    fn require_no_edits(&self) -> Result<()> {
        if self.buffer.is_modified() { Err(Error::EditSessionOpen) } else { Ok(()) }
    }

    // ---- Scenarios ----

    /// Make `scenario` active for the current task.
    pub fn switch_scenario(&mut self, scenario: ScenarioId) -> Result<()> {
        self.switch_scenario_with(scenario, &TaskControl::new())
    }

    /// As [`switch_scenario`](Self::switch_scenario), with cancellation and
    /// progress reporting.
    pub fn switch_scenario_with(&mut self, scenario: ScenarioId, control: &TaskControl) -> Result<()> {
        self.require_no_edits()?;
        self.activate(scenario, self.task, control)
    }

    /// Make `task` the active district type for the current scenario.
    pub fn switch_task(&mut self, task: Task) -> Result<()> {
        self.require_no_edits()?;
        self.activate(self.scenario, task, &TaskControl::new())
    }

    /// Stage `scenario`'s electorates and recompute the district store.
    /// Nothing is written unless every step succeeds.
    fn activate(&mut self, scenario: ScenarioId, task: Task, control: &TaskControl) -> Result<()> {
        if !self.registry.scenario_exists(scenario) { return Err(Error::UnknownScenario(scenario)) }

        let switch = ScenarioSwitchTask::new(&self.registry, &self.districts, &self.meshblocks, scenario, Some(task), &self.settings)?;
        let updates = switch.calculate_new_electorates(&self.meshblocks, control)?;

        let table = self.buffer.provider_mut()?;
        UpdateStagedElectoratesTask::new(scenario, task).run(&self.registry, table, control)?;
        apply_electorate_updates(&mut self.districts, &updates)?;

        self.queue.clear();
        self.scenario = scenario;
        self.task = task;
        control.set_progress(100.0);
        info!("active scenario {scenario} ({task}), {} electorates recomputed", updates.len());
        Ok(())
    }

    /// Copy `source` to a new scenario called `name`.
    pub fn branch_scenario(&mut self, source: ScenarioId, name: &str) -> Result<ScenarioId> {
        self.require_no_edits()?;
        Arc::make_mut(&mut self.registry).branch_scenario(source, name)
    }

    /// Copy scenario `source` of another registry into this one as `name`.
    pub fn import_scenario(&mut self, other: &ScenarioRegistry, source: ScenarioId, name: &str) -> Result<ScenarioId> {
        self.require_no_edits()?;
        Arc::make_mut(&mut self.registry).import_scenario(other, source, name)
    }

    /// Start a background comparison over the committed assignments.
    pub fn compare(&self, request: ComparisonRequest) -> Result<ComparisonHandle> {
        self.require_no_edits()?;
        spawn_comparison(Arc::clone(&self.registry), Arc::clone(&self.meshblocks), request, &self.settings)
    }

    // ---- Statistics ----

    /// Flag the official statistics of `electorates` as stale and build the
    /// concordance to send to the statistics service.
    pub fn request_population_update(&mut self, electorates: &[ElectorateId]) -> Result<Vec<ConcordanceItem>> {
        let mut concordance = Vec::new();
        for &id in electorates {
            let task = self.districts.electorate(id)?.task;
            for number in self.registry.electorate_meshblocks(id, task, self.scenario)? {
                concordance.push(ConcordanceItem::new(&number.formatted(), &id.to_string(), task));
            }
        }
        for &id in electorates {
            self.districts.flag_stats_updating(id)?;
        }
        Ok(concordance)
    }

    /// Store the statistics service's answer.
    pub fn apply_population_table(&mut self, rows: &[PopulationRow]) -> Result<usize> {
        self.districts.apply_population_table(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        district::Electorate,
        map::{Crs, Meshblock},
        scenario::AssignmentRecord,
    };
    use geo::{coord, Area, MultiPolygon, Rect};

    fn square(x: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: x, y: 0.0 }, coord! { x: x + 1.0, y: 1.0 }).to_polygon()])
    }

    /// Meshblocks 11..=14 in a row; scenario 1 puts 11,12 in electorate 1
    /// and 13,14 in electorate 2, scenario 2 moves 12 to electorate 2.
    fn session() -> RedistrictingSession {
        session_with(Settings::default())
    }

    fn session_with(settings: Settings) -> RedistrictingSession {
        let meshblocks = MeshblockLayer::new(Crs::NZTM, (0..4)
            .map(|i| Meshblock::new(MeshblockNumber(11 + i), square(i as f64)).with_offline_pop(Task::GeneralNorth, 100))
            .collect()
        ).unwrap();

        let (s1, s2) = (ScenarioId(1), ScenarioId(2));
        let mut rows = Vec::new();
        for (number, e1, e2) in [(11, 1, 1), (12, 1, 2), (13, 2, 2), (14, 2, 2)] {
            rows.push(AssignmentRecord::new(s1, MeshblockNumber(number)).with_electorate(Task::GeneralNorth, ElectorateId(e1)));
            rows.push(AssignmentRecord::new(s2, MeshblockNumber(number)).with_electorate(Task::GeneralNorth, ElectorateId(e2)));
        }
        let registry = ScenarioRegistry::from_parts([(s1, "One".to_string()), (s2, "Two".to_string())], rows).unwrap();

        let mut districts = DistrictStore::empty();
        districts.add_electorate(&Electorate::new(ElectorateId(1), Task::GeneralNorth, "GN01", "One").with_expected_regions(1), None).unwrap();
        districts.add_electorate(&Electorate::new(ElectorateId(2), Task::GeneralNorth, "GN02", "Two").with_expected_regions(1), None).unwrap();

        let quotas = DistrictRegistry::new([(Task::GeneralNorth, 200)]);
        RedistrictingSession::new(settings, registry, meshblocks, districts, quotas, s1, Task::GeneralNorth).unwrap()
    }

    fn pop(session: &RedistrictingSession, id: i64) -> Option<i64> {
        session.districts().electorate(ElectorateId(id)).unwrap().estimated_pop
    }

    #[test]
    fn opening_stages_and_recomputes() {
        let session = session();
        assert_eq!(session.staged_electorate(MeshblockNumber(12)), Some(ElectorateId(1)));
        assert_eq!(pop(&session, 1), Some(200));
        assert_eq!(pop(&session, 2), Some(200));
        let area = session.districts().geometry(ElectorateId(1)).unwrap().unwrap().unsigned_area();
        assert!((area - 2.0).abs() < 1e-9);
    }

    #[test]
    fn redistrict_undo_redo_keeps_stores_in_step() {
        let mut session = session();
        session.start_editing();
        session.redistrict(&[MeshblockNumber(12)], ElectorateId(2)).unwrap();
        assert_eq!(session.staged_electorate(MeshblockNumber(12)), Some(ElectorateId(2)));
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(100), Some(300)));
        assert_eq!(session.audit().len(), 1);

        assert!(session.undo());
        assert_eq!(session.staged_electorate(MeshblockNumber(12)), Some(ElectorateId(1)));
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(200), Some(200)));
        assert!(session.audit().is_empty());

        assert!(session.redo());
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(100), Some(300)));
        assert!(!session.redo());
    }

    #[test]
    fn commit_writes_scenario_assignments() {
        let mut session = session();
        session.start_editing();
        session.redistrict(&[MeshblockNumber(12)], ElectorateId(2)).unwrap();
        assert_eq!(session.new_electorates().unwrap(), BTreeMap::from([(MeshblockNumber(12), Some(ElectorateId(2)))]));

        assert_eq!(session.commit().unwrap(), 1);
        assert!(session.queue().is_empty());
        let assigned = session.registry().electorate_assignments(Task::GeneralNorth, ScenarioId(1)).unwrap();
        assert_eq!(assigned[&MeshblockNumber(12)], ElectorateId(2));
    }

    #[test]
    fn rollback_restores_everything() {
        let mut session = session();
        session.start_editing();
        session.redistrict(&[MeshblockNumber(12), MeshblockNumber(11)], ElectorateId(2)).unwrap();
        session.rollback();
        assert_eq!(session.staged_electorate(MeshblockNumber(11)), Some(ElectorateId(1)));
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(200), Some(200)));
        assert!(session.audit().is_empty());
        assert!(!session.is_modified());
    }

    #[test]
    fn rollback_past_queue_capacity_restores_everything() {
        let mut session = session_with(Settings { queue_capacity: 1, ..Settings::default() });
        session.start_editing();
        session.redistrict(&[MeshblockNumber(12)], ElectorateId(2)).unwrap();
        session.redistrict(&[MeshblockNumber(11)], ElectorateId(2)).unwrap();
        assert_eq!(session.queue().offset(), 1);

        session.rollback();
        assert_eq!(session.staged_electorate(MeshblockNumber(12)), Some(ElectorateId(1)));
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(200), Some(200)));
        let area = session.districts().geometry(ElectorateId(1)).unwrap().unwrap().unsigned_area();
        assert!((area - 2.0).abs() < 1e-9);
        assert!(session.audit().is_empty());
    }

    #[test]
    fn repeated_meshblocks_move_once() {
        let mut session = session();
        session.start_editing();
        session.redistrict(&[MeshblockNumber(12), MeshblockNumber(12)], ElectorateId(2)).unwrap();
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(100), Some(300)));
        assert_eq!(session.audit().len(), 1);
    }

    #[test]
    fn scenario_operations_need_a_clean_session() {
        let mut session = session();
        session.start_editing();
        session.redistrict(&[MeshblockNumber(12)], ElectorateId(2)).unwrap();
        assert!(matches!(session.switch_scenario(ScenarioId(2)), Err(Error::EditSessionOpen)));
        assert!(matches!(session.branch_scenario(ScenarioId(1), "Copy"), Err(Error::EditSessionOpen)));
        let request = ComparisonRequest { task: Task::GeneralNorth, base_scenario: ScenarioId(1), secondary_scenario: ScenarioId(2), extent: None };
        assert!(matches!(session.compare(request), Err(Error::EditSessionOpen)));
    }

    #[test]
    fn switching_scenario_restages() {
        let mut session = session();
        session.switch_scenario(ScenarioId(2)).unwrap();
        assert_eq!(session.scenario(), ScenarioId(2));
        assert_eq!(session.staged_electorate(MeshblockNumber(12)), Some(ElectorateId(2)));
        assert_eq!((pop(&session, 1), pop(&session, 2)), (Some(100), Some(300)));
        assert!(matches!(session.switch_scenario(ScenarioId(9)), Err(Error::UnknownScenario(_))));
        assert_eq!(session.scenario(), ScenarioId(2));
    }

    #[test]
    fn branch_then_compare() {
        let mut session = session();
        let copy = session.branch_scenario(ScenarioId(2), "Copy").unwrap();
        assert_eq!(copy, ScenarioId(3));

        let request = ComparisonRequest { task: Task::GeneralNorth, base_scenario: ScenarioId(1), secondary_scenario: copy, extent: None };
        let output = session.compare(request).unwrap().join().unwrap();
        assert_eq!(output.changed_meshblocks.len(), 1);
        assert_eq!(output.changed_meshblocks[0].meshblock_number, "0000012");
    }

    #[test]
    fn population_update_round_trip() {
        let mut session = session();
        let concordance = session.request_population_update(&[ElectorateId(1)]).unwrap();
        assert_eq!(concordance.len(), 2);
        assert_eq!(concordance[0].meshblock_number, "0000011");
        assert_eq!(concordance[0].electorate, "N01");

        let row = PopulationRow { electorate: "N01".into(), current_population: Some(210), variance_year_1: Some(0.5), variance_year_2: None };
        assert_eq!(session.apply_population_table(&[row]).unwrap(), 1);
        assert_eq!(session.districts().electorate(ElectorateId(1)).unwrap().stats_nz_pop, Some(210));
    }
}
