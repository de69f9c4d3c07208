use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ElectorateId, MeshblockNumber, ScenarioId, Task};

/// One line of the user audit log: who moved which meshblock where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    pub username: String,
    pub scenario_id: ScenarioId,
    pub task: Task,
    pub meshblock_number: MeshblockNumber,
    pub from_electorate: Option<ElectorateId>,
    pub to_electorate: Option<ElectorateId>,
}

/// Append-mostly audit log. Rows keep their id when removed and restored,
/// so undo and redo preserve the original ordering.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    rows: BTreeMap<u64, AuditRow>,
    next_id: u64,
}

impl AuditLog {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Append rows, returning the ids assigned to them.
    pub fn append(&mut self, rows: Vec<AuditRow>) -> Vec<u64> {
        rows.into_iter()
            .map(|row| {
                let id = self.next_id;
                self.next_id += 1;
                self.rows.insert(id, row);
                id
            })
            .collect()
    }

    /// Remove rows by id; missing ids are ignored.
    pub fn remove(&mut self, ids: &[u64]) {
        for id in ids {
            self.rows.remove(id);
        }
    }

    /// Put previously removed rows back under their original ids.
    pub fn restore(&mut self, rows: impl IntoIterator<Item = (u64, AuditRow)>) {
        for (id, row) in rows {
            self.next_id = self.next_id.max(id + 1);
            self.rows.insert(id, row);
        }
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = &AuditRow> { self.rows.values() }
}
