use std::collections::{BTreeMap, BTreeSet};

use coverage::{union_coverage, UnionOptions};
use geo::{BooleanOps, MultiPolygon};
use tracing::debug;

use crate::{
    district::{DistrictStore, Electorate},
    edit::{AttributeChanges, AuditLog, AuditRow, ElectorateEditQueue, GeometryChanges},
    error::{Error, Result},
    map::MeshblockLayer,
    redistrict::RedistrictHandler,
    store::FeatureEditor,
    types::{ElectorateId, FeatureId, ScenarioId, Task, Value},
};

/// Stores touched by an electorate redistrict, borrowed for one call.
pub struct RedistrictStores<'a> {
    pub meshblocks: &'a MeshblockLayer,
    pub districts: &'a mut DistrictStore,
    pub audit: &'a mut AuditLog,
    pub queue: &'a mut ElectorateEditQueue,
}

/// Moves meshblocks between electorates of one task.
///
/// Besides writing the staged electorate of each meshblock, every
/// assignment updates the estimated population and geometry of the
/// electorates involved, logs one audit row per moved meshblock and pushes
/// all of it as a single edit queue entry, inside the same host edit group.
#[derive(Debug, Clone)]
pub struct ElectorateRedistrictHandler {
    handler: RedistrictHandler,
    username: String,
    scenario: ScenarioId,
    task: Task,
    options: UnionOptions,
}

impl ElectorateRedistrictHandler {
    pub fn new(staged_field: usize, username: &str, scenario: ScenarioId, task: Task, options: UnionOptions) -> Self {
        Self {
            handler: RedistrictHandler::new(staged_field),
            username: username.to_string(),
            scenario,
            task,
            options,
        }
    }

    #[inline] pub fn task(&self) -> Task { self.task }
    #[inline] pub fn scenario(&self) -> ScenarioId { self.scenario }

    /// Assign the meshblocks at `targets` to `electorate`.
    ///
    /// Either everything is applied (host edit group, district store, audit
    /// log and queue) or nothing is: on failure the edit group is discarded.
    pub fn assign_district(&self, editor: &mut dyn FeatureEditor, targets: &[FeatureId], electorate: ElectorateId, stores: RedistrictStores<'_>) -> Result<()> {
        if targets.is_empty() { return Ok(()) }
        if !editor.is_editable() {
            return Err(Error::AssignmentFailed(String::from("meshblock layer is not editable")))
        }

        let target = stores.districts.electorate(electorate)?;
        if target.task != self.task {
            return Err(Error::AssignmentFailed(format!("{} is not a {} electorate", target.code, self.task.title())))
        }

        self.handler.begin_edit_group(editor, &format!("Redistrict to {}", target.code));
        match self.apply(editor, targets, &target, stores) {
            Ok(()) => {
                self.handler.end_edit_group(editor);
                Ok(())
            }
            Err(e) => {
                self.handler.discard_edit_group(editor);
                Err(e)
            }
        }
    }

    fn apply(&self, editor: &mut dyn FeatureEditor, targets: &[FeatureId], target: &Electorate, stores: RedistrictStores<'_>) -> Result<()> {
        let RedistrictStores { meshblocks, districts, audit, queue } = stores;
        let field = self.handler.target_field();
        let targets = targets.iter().copied().collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>();

        let previous = targets.iter()
            .map(|&fid| (fid, editor.attribute(fid, field).and_then(|v| v.as_i64()).map(ElectorateId)))
            .collect::<Vec<_>>();
        self.handler.write_targets(editor, &targets, &Value::Int(target.id.0))?;

        let mut deltas: BTreeMap<ElectorateId, i64> = BTreeMap::new();
        let mut gained = Vec::new();
        let mut lost: BTreeMap<ElectorateId, Vec<MultiPolygon<f64>>> = BTreeMap::new();
        let mut rows = Vec::new();
        for (fid, from) in previous.into_iter().filter(|(_, from)| *from != Some(target.id)) {
            let meshblock = meshblocks.feature(fid).ok_or(Error::UnknownFeature(fid))?;
            let pop = meshblock.offline_pop(self.task).unwrap_or(0);

            *deltas.entry(target.id).or_default() += pop;
            gained.push(meshblock.geometry.clone());
            if let Some(from) = from {
                *deltas.entry(from).or_default() -= pop;
                lost.entry(from).or_default().push(meshblock.geometry.clone());
            }
            rows.push(AuditRow {
                username: self.username.clone(),
                scenario_id: self.scenario,
                task: self.task,
                meshblock_number: meshblock.number,
                from_electorate: from,
                to_electorate: Some(target.id),
            });
        }

        let mut attributes = AttributeChanges::new();
        for (&id, &delta) in &deltas {
            let fid = districts.feature_id(id)?;
            let current = districts.electorate(id)?.estimated_pop.unwrap_or(0);
            attributes.entry(fid).or_default()
                .insert(districts.schema().estimated_pop, Value::Int(current + delta));
        }

        let mut geometries = GeometryChanges::new();
        if !gained.is_empty() {
            if let Some(existing) = districts.geometry(target.id)? {
                gained.push(existing.clone());
            }
            let merged = union_coverage(&gained, &self.options)?;
            geometries.insert(districts.feature_id(target.id)?, Some(merged));
        }
        for (id, shapes) in lost {
            let Some(existing) = districts.geometry(id)? else { continue };
            let removed = union_coverage(&shapes, &self.options)?;
            let remaining = existing.difference(&removed);
            geometries.insert(districts.feature_id(id)?, (!remaining.0.is_empty()).then_some(remaining));
        }

        debug!("redistrict to {}: {} meshblocks moved, {} electorates updated", target.code, rows.len(), deltas.len());
        queue.push_changes(districts.table_mut(), audit, attributes, geometries, rows)
    }
}
