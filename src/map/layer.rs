use ahash::AHashMap;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    map::{Crs, MeshblockSchema},
    store::FeatureTable,
    types::{FeatureId, MeshblockNumber, Task, Value},
};

/// A census meshblock: the smallest unit assigned to electorates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meshblock {
    #[serde(rename = "meshblock_number")]
    pub number: MeshblockNumber,
    #[serde(with = "crate::io::geojson::multipolygon")]
    pub geometry: MultiPolygon<f64>,
    #[serde(default)]
    pub offline_pop_gn: Option<i64>,
    #[serde(default)]
    pub offline_pop_gs: Option<i64>,
    #[serde(default)]
    pub offline_pop_m: Option<i64>,
    #[serde(default)]
    pub offshore: bool,
}

impl Meshblock {
    pub fn new(number: MeshblockNumber, geometry: MultiPolygon<f64>) -> Self {
        Self { number, geometry, offline_pop_gn: None, offline_pop_gs: None, offline_pop_m: None, offshore: false }
    }

    /// Offline population counted towards electorates of type `task`.
    pub fn offline_pop(&self, task: Task) -> Option<i64> {
        match task {
            Task::GeneralNorth => self.offline_pop_gn,
            Task::GeneralSouth => self.offline_pop_gs,
            Task::Maori => self.offline_pop_m,
        }
    }

    pub fn with_offline_pop(mut self, task: Task, pop: i64) -> Self {
        match task {
            Task::GeneralNorth => self.offline_pop_gn = Some(pop),
            Task::GeneralSouth => self.offline_pop_gs = Some(pop),
            Task::Maori => self.offline_pop_m = Some(pop),
        }
        self
    }

    pub fn with_offshore(mut self, offshore: bool) -> Self {
        self.offshore = offshore;
        self
    }
}

/// The meshblock layer: geometry and populations, indexed by meshblock number.
///
/// Feature ids are positions in the layer and are stable for its lifetime.
#[derive(Debug, Clone)]
pub struct MeshblockLayer {
    crs: Crs,
    meshblocks: Vec<Meshblock>,
    index: AHashMap<MeshblockNumber, FeatureId>,
}

impl MeshblockLayer {
    /// Build a layer; meshblock numbers must be unique.
    pub fn new(crs: Crs, meshblocks: Vec<Meshblock>) -> Result<Self> {
        let mut index = AHashMap::with_capacity(meshblocks.len());
        for (i, meshblock) in meshblocks.iter().enumerate() {
            if index.insert(meshblock.number, FeatureId(i as u32)).is_some() {
                return Err(Error::consistency(format!("meshblock {} appears more than once", meshblock.number)))
            }
        }
        Ok(Self { crs, meshblocks, index })
    }

    #[inline] pub fn crs(&self) -> Crs { self.crs }
    #[inline] pub fn len(&self) -> usize { self.meshblocks.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.meshblocks.is_empty() }

    #[inline] pub fn contains(&self, number: MeshblockNumber) -> bool { self.index.contains_key(&number) }

    #[inline] pub fn feature_id(&self, number: MeshblockNumber) -> Option<FeatureId> { self.index.get(&number).copied() }

    #[inline]
    pub fn get(&self, number: MeshblockNumber) -> Option<&Meshblock> {
        self.feature_id(number).and_then(|id| self.feature(id))
    }

    #[inline] pub fn feature(&self, id: FeatureId) -> Option<&Meshblock> { self.meshblocks.get(id.0 as usize) }

    /// Get a meshblock or fail with a consistency error naming it.
    pub fn require(&self, number: MeshblockNumber) -> Result<&Meshblock> {
        self.get(number).ok_or_else(|| Error::consistency(format!("meshblock {number} is not in the meshblock layer")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Meshblock)> {
        self.meshblocks.iter().enumerate().map(|(i, meshblock)| (FeatureId(i as u32), meshblock))
    }

    /// An editable attribute table for this layer, with feature ids aligned
    /// to the layer and every staged electorate null.
    pub fn attribute_table(&self) -> FeatureTable {
        let mut table = FeatureTable::new("meshblocks", MeshblockSchema::FIELDS);
        for (id, meshblock) in self.iter() {
            table.insert_feature(id, vec![Value::from(meshblock.number.formatted()), Value::Null], None);
        }
        table
    }
}
