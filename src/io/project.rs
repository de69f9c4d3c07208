use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::Settings,
    district::{DistrictRegistry, DistrictStore, Electorate},
    error::Result,
    map::{Crs, Meshblock, MeshblockLayer},
    scenario::{AssignmentRecord, ScenarioRegistry},
    session::RedistrictingSession,
    types::{ScenarioId, Task},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEntry {
    pub id: ScenarioId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectorateEntry {
    #[serde(flatten)]
    pub electorate: Electorate,
    #[serde(default, with = "crate::io::geojson::optional")]
    pub geometry: Option<MultiPolygon<f64>>,
}

/// On-disk form of a redistricting project: meshblocks, electorates,
/// scenarios with their assignments, and the quota per district type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub crs: Crs,
    #[serde(default)]
    pub quotas: DistrictRegistry,
    #[serde(default)]
    pub scenarios: Vec<ScenarioEntry>,
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
    pub meshblocks: Vec<Meshblock>,
    #[serde(default)]
    pub electorates: Vec<ElectorateEntry>,
}

/// The in-memory stores a project file describes.
#[derive(Debug, Clone)]
pub struct ProjectData {
    pub registry: ScenarioRegistry,
    pub meshblocks: MeshblockLayer,
    pub districts: DistrictStore,
    pub quotas: DistrictRegistry,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let project: Self = serde_json::from_reader(BufReader::new(file))?;
        debug!("loaded project {}: {} meshblocks, {} scenarios", path.display(), project.meshblocks.len(), project.scenarios.len());
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Snapshot a set of stores.
    pub fn capture(data: &ProjectData) -> Result<Self> {
        let scenarios = data.registry.scenarios()
            .map(|(id, name)| ScenarioEntry { id, name: name.to_string() })
            .collect::<Vec<_>>();

        let mut assignments = Vec::new();
        for entry in &scenarios {
            assignments.extend(data.registry.assignments(entry.id)?.cloned());
        }

        let mut electorates = Vec::with_capacity(data.districts.len());
        for electorate in data.districts.electorates()? {
            let geometry = data.districts.geometry(electorate.id)?.cloned();
            electorates.push(ElectorateEntry { electorate, geometry });
        }

        Ok(Self {
            crs: data.meshblocks.crs(),
            quotas: data.quotas.clone(),
            scenarios,
            assignments,
            meshblocks: data.meshblocks.iter().map(|(_, meshblock)| meshblock.clone()).collect(),
            electorates,
        })
    }

    /// Build the stores, checking ids and names for uniqueness.
    pub fn into_data(self) -> Result<ProjectData> {
        let registry = ScenarioRegistry::from_parts(
            self.scenarios.into_iter().map(|entry| (entry.id, entry.name)),
            self.assignments,
        )?;
        let meshblocks = MeshblockLayer::new(self.crs, self.meshblocks)?;
        let mut districts = DistrictStore::empty();
        for entry in self.electorates {
            districts.add_electorate(&entry.electorate, entry.geometry)?;
        }
        Ok(ProjectData { registry, meshblocks, districts, quotas: self.quotas })
    }
}

impl ProjectData {
    /// Open an editing session on `scenario` and `task`.
    pub fn into_session(self, settings: Settings, scenario: ScenarioId, task: Task) -> Result<RedistrictingSession> {
        RedistrictingSession::new(settings, self.registry, self.meshblocks, self.districts, self.quotas, scenario, task)
    }
}
