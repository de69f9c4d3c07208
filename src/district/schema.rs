use crate::{error::Result, store::FeatureTable};

/// Field indices of the electorate table, resolved once by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectorateSchema {
    pub electorate_id: usize,
    pub electorate_type: usize,
    pub code: usize,
    pub name: usize,
    pub expected_regions: usize,
    pub deprecated: usize,
    pub estimated_pop: usize,
    pub stats_nz_pop: usize,
    pub stats_nz_var_20: usize,
    pub stats_nz_var_23: usize,
    pub invalid: usize,
    pub invalid_reason: usize,
}

impl ElectorateSchema {
    /// Field layout of a freshly created electorate table.
    pub const FIELDS: [&'static str; 12] = [
        "electorate_id",
        "type",
        "code",
        "name",
        "expected_regions",
        "deprecated",
        "estimated_pop",
        "stats_nz_pop",
        "stats_nz_var_20",
        "stats_nz_var_23",
        "invalid",
        "invalid_reason",
    ];

    pub fn resolve(table: &FeatureTable) -> Result<Self> {
        Ok(Self {
            electorate_id: table.lookup_field("electorate_id")?,
            electorate_type: table.lookup_field("type")?,
            code: table.lookup_field("code")?,
            name: table.lookup_field("name")?,
            expected_regions: table.lookup_field("expected_regions")?,
            deprecated: table.lookup_field("deprecated")?,
            estimated_pop: table.lookup_field("estimated_pop")?,
            stats_nz_pop: table.lookup_field("stats_nz_pop")?,
            stats_nz_var_20: table.lookup_field("stats_nz_var_20")?,
            stats_nz_var_23: table.lookup_field("stats_nz_var_23")?,
            invalid: table.lookup_field("invalid")?,
            invalid_reason: table.lookup_field("invalid_reason")?,
        })
    }

    /// Schema matching [`ElectorateSchema::FIELDS`].
    pub(crate) fn standard() -> Self {
        Self {
            electorate_id: 0,
            electorate_type: 1,
            code: 2,
            name: 3,
            expected_regions: 4,
            deprecated: 5,
            estimated_pop: 6,
            stats_nz_pop: 7,
            stats_nz_var_20: 8,
            stats_nz_var_23: 9,
            invalid: 10,
            invalid_reason: 11,
        }
    }
}
