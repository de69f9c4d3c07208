use std::collections::{BTreeMap, VecDeque};

use geo::MultiPolygon;
use smallvec::SmallVec;
use tracing::{debug, error, warn};

use crate::{
    edit::{AuditLog, AuditRow},
    error::{Error, Result},
    store::FeatureTable,
    types::{FeatureId, Value},
};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// New attribute values, by feature then field index.
pub type AttributeChanges = BTreeMap<FeatureId, BTreeMap<usize, Value>>;

/// New geometries by feature; `None` clears the geometry.
pub type GeometryChanges = BTreeMap<FeatureId, Option<MultiPolygon<f64>>>;

#[derive(Debug, Clone)]
struct FieldDiff {
    field: usize,
    old: Value,
    new: Value,
}

#[derive(Debug, Clone)]
struct GeometryDiff {
    old: Option<MultiPolygon<f64>>,
    new: Option<MultiPolygon<f64>>,
}

/// One logical edit: attribute and geometry diffs plus the audit rows it added.
#[derive(Debug, Clone)]
struct QueueEntry {
    host_index: usize, // host undo index when this entry was pushed
    attributes: BTreeMap<FeatureId, SmallVec<[FieldDiff; 4]>>,
    geometries: BTreeMap<FeatureId, GeometryDiff>,
    audit: Vec<(u64, AuditRow)>,
}

impl QueueEntry {
    /// Whether every feature and field this entry touches still exists.
    fn is_applicable(&self, table: &FeatureTable) -> bool {
        self.attributes.iter().all(|(&fid, diffs)| {
            table.feature(fid).is_some_and(|f| diffs.iter().all(|d| d.field < f.attributes.len()))
        }) && self.geometries.keys().all(|&fid| table.contains(fid))
    }

    fn apply(&self, table: &mut FeatureTable, audit: &mut AuditLog) {
        for (&fid, diffs) in &self.attributes {
            if let Some(feature) = table.feature_mut(fid) {
                for diff in diffs {
                    feature.attributes[diff.field] = diff.new.clone();
                }
            }
        }
        for (&fid, diff) in &self.geometries {
            if let Some(feature) = table.feature_mut(fid) {
                feature.geometry = diff.new.clone();
            }
        }
        audit.restore(self.audit.iter().cloned());
    }

    fn revert(&self, table: &mut FeatureTable, audit: &mut AuditLog) {
        for (&fid, diffs) in self.attributes.iter().rev() {
            if let Some(feature) = table.feature_mut(fid) {
                for diff in diffs.iter().rev() {
                    feature.attributes[diff.field] = diff.old.clone();
                }
            }
        }
        for (&fid, diff) in self.geometries.iter().rev() {
            if let Some(feature) = table.feature_mut(fid) {
                feature.geometry = diff.old.clone();
            }
        }
        audit.remove(&self.audit.iter().map(|(id, _)| *id).collect::<Vec<_>>());
    }
}

/// State overwritten by entries dropped for capacity, so a rollback can
/// still restore it. The first value recorded for each field wins.
#[derive(Debug, Clone, Default)]
struct Baseline {
    attributes: BTreeMap<(FeatureId, usize), Value>,
    geometries: BTreeMap<FeatureId, Option<MultiPolygon<f64>>>,
    audit: Vec<u64>,
}

impl Baseline {
    fn absorb(&mut self, entry: QueueEntry) {
        for (fid, diffs) in entry.attributes {
            for diff in diffs {
                self.attributes.entry((fid, diff.field)).or_insert(diff.old);
            }
        }
        for (fid, diff) in entry.geometries {
            self.geometries.entry(fid).or_insert(diff.old);
        }
        self.audit.extend(entry.audit.into_iter().map(|(id, _)| id));
    }

    fn restore(&self, table: &mut FeatureTable, audit: &mut AuditLog) {
        for (&(fid, field), old) in &self.attributes {
            if let Some(feature) = table.feature_mut(fid) {
                if let Some(value) = feature.attributes.get_mut(field) {
                    *value = old.clone();
                }
            }
        }
        for (&fid, old) in &self.geometries {
            if let Some(feature) = table.feature_mut(fid) {
                feature.geometry = old.clone();
            }
        }
        audit.remove(&self.audit);
    }
}

/// Bounded linear undo/redo history of changes to the electorate table,
/// kept in step with a host undo stack by index.
///
/// Entries `[..position]` are applied. When the history grows past its
/// capacity the oldest entry is dropped and its changes become permanent;
/// `offset` counts dropped entries so that host indices still line up.
/// Dropped entries can no longer be stepped through, but
/// [`rollback`](Self::rollback) still reverts them.
#[derive(Debug, Clone)]
pub struct ElectorateEditQueue {
    entries: VecDeque<QueueEntry>,
    position: usize,
    offset: usize,
    capacity: usize,
    baseline: Baseline,
}

impl Default for ElectorateEditQueue {
    fn default() -> Self { Self::new(DEFAULT_QUEUE_CAPACITY) }
}

impl ElectorateEditQueue {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), position: 0, offset: 0, capacity: capacity.max(1), baseline: Baseline::default() }
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    #[inline] pub fn capacity(&self) -> usize { self.capacity }

    /// Number of applied entries still held.
    #[inline] pub fn position(&self) -> usize { self.position }

    /// Number of entries dropped from the front because of the capacity.
    #[inline] pub fn offset(&self) -> usize { self.offset }

    /// Position expressed as a host undo index.
    #[inline] pub fn external_position(&self) -> usize { self.offset + self.position }

    #[inline] pub fn can_back(&self) -> bool { self.position > 0 }
    #[inline] pub fn can_forward(&self) -> bool { self.position < self.entries.len() }

    /// Apply a new entry to `table` and `audit`, discarding any redo branch.
    ///
    /// Every feature id and field index is validated first; on failure the
    /// table, audit log and queue are left untouched.
    pub fn push_changes(
        &mut self,
        table: &mut FeatureTable,
        audit: &mut AuditLog,
        attributes: AttributeChanges,
        geometries: GeometryChanges,
        rows: Vec<AuditRow>,
    ) -> Result<()> {
        for (&fid, fields) in &attributes {
            if !table.contains(fid) { return Err(Error::UnknownFeature(fid)) }
            for &field in fields.keys() {
                table.check_field(field)?;
            }
        }
        if let Some(&fid) = geometries.keys().find(|&&fid| !table.contains(fid)) {
            return Err(Error::UnknownFeature(fid))
        }

        let attributes = attributes.into_iter()
            .map(|(fid, fields)| {
                let diffs = fields.into_iter()
                    .map(|(field, new)| FieldDiff { field, old: table.attribute(fid, field).cloned().unwrap_or_default(), new })
                    .collect();
                (fid, diffs)
            })
            .collect();
        let geometries = geometries.into_iter()
            .map(|(fid, new)| (fid, GeometryDiff { old: table.geometry(fid).cloned(), new }))
            .collect();

        let ids = audit.append(rows.clone());
        let entry = QueueEntry {
            host_index: self.external_position(),
            attributes,
            geometries,
            audit: ids.into_iter().zip(rows).collect(),
        };
        entry.apply(table, audit);

        self.entries.truncate(self.position);
        self.entries.push_back(entry);
        self.position += 1;

        while self.entries.len() > self.capacity {
            let Some(dropped) = self.entries.pop_front() else { break };
            self.baseline.absorb(dropped);
            self.position -= 1;
            self.offset += 1;
            debug!("edit queue full, oldest entry made permanent (offset {})", self.offset);
        }
        Ok(())
    }

    /// Revert the most recent applied entry.
    pub fn back(&mut self, table: &mut FeatureTable, audit: &mut AuditLog) -> bool {
        if !self.can_back() { return false }
        let entry = &self.entries[self.position - 1];
        if !entry.is_applicable(table) {
            error!("cannot revert edit at host index {}: its features no longer exist", entry.host_index);
            return false
        }
        entry.revert(table, audit);
        self.position -= 1;
        true
    }

    /// Re-apply the entry just ahead of the current position.
    pub fn forward(&mut self, table: &mut FeatureTable, audit: &mut AuditLog) -> bool {
        if !self.can_forward() { return false }
        let entry = &self.entries[self.position];
        if !entry.is_applicable(table) {
            error!("cannot re-apply edit at host index {}: its features no longer exist", entry.host_index);
            return false
        }
        entry.apply(table, audit);
        self.position += 1;
        true
    }

    /// Move back or forward until exactly the entries pushed before host
    /// index `index` are applied. Indices beyond what is held are clamped.
    pub fn sync_to_external_index(&mut self, table: &mut FeatureTable, audit: &mut AuditLog, index: usize) {
        while self.position > 0 && self.entries[self.position - 1].host_index >= index {
            if !self.back(table, audit) { return }
        }
        while self.position < self.entries.len() && self.entries[self.position].host_index < index {
            if !self.forward(table, audit) { return }
        }
    }

    /// Revert every entry pushed since the last clear, including those
    /// dropped for capacity, and discard the history.
    pub fn rollback(&mut self, table: &mut FeatureTable, audit: &mut AuditLog) {
        while self.back(table, audit) {}
        if self.position > 0 {
            warn!("edit queue rollback stopped with {} entries still applied", self.position);
        } else if self.offset > 0 {
            debug!("restoring state from before {} dropped entries", self.offset);
            self.baseline.restore(table, audit);
        }
        self.clear();
    }

    /// Discard the history, keeping the current state.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
        self.offset = 0;
        self.baseline = Baseline::default();
    }
}
