use crate::{error::Result, store::FeatureTable};

/// Field indices of the meshblock attribute table, resolved once by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshblockSchema {
    pub meshblock_number: usize,
    pub staged_electorate: usize,
}

impl MeshblockSchema {
    pub const FIELDS: [&'static str; 2] = ["meshblock_number", "staged_electorate"];

    pub fn resolve(table: &FeatureTable) -> Result<Self> {
        Ok(Self {
            meshblock_number: table.lookup_field("meshblock_number")?,
            staged_electorate: table.lookup_field("staged_electorate")?,
        })
    }
}
