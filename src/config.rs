use std::path::Path;

use serde::{Deserialize, Serialize};

use coverage::DEFAULT_TOLERANCE;

use crate::error::Result;

/// Engine settings, typically loaded from a JSON file next to the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name recorded in audit rows.
    pub username: String,
    /// Vertex snapping tolerance for geometry unions, in layer units.
    pub union_tolerance: f64,
    /// Maximum number of entries kept in the electorate edit queue.
    pub queue_capacity: usize,
    /// Dummy electorate ids are drawn from `1..=dummy_pool_max`, capped at 99.
    pub dummy_pool_max: i64,
    /// Worker threads for parallel unions; 0 uses the global pool.
    pub worker_threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::from("redistrict"),
            union_tolerance: DEFAULT_TOLERANCE,
            queue_capacity: 1000,
            dummy_pool_max: 99,
            worker_threads: 0,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Union options derived from these settings.
    #[inline] pub fn union_options(&self) -> coverage::UnionOptions {
        coverage::UnionOptions::with_tolerance(self.union_tolerance)
    }
}
