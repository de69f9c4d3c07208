use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    district::DistrictStore,
    error::{Error, Result},
    types::{ElectorateId, Task},
};

/// Allowed deviation of an electorate's population from its quota.
pub const QUOTA_TOLERANCE: f64 = 0.05;

/// Population quotas per electorate type, and queries over a [`DistrictStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictRegistry {
    quotas: BTreeMap<Task, i64>,
}

impl DistrictRegistry {
    pub fn new(quotas: impl IntoIterator<Item = (Task, i64)>) -> Self {
        Self { quotas: quotas.into_iter().collect() }
    }

    #[inline] pub fn quotas(&self) -> &BTreeMap<Task, i64> { &self.quotas }

    pub fn quota_for_type(&self, task: Task) -> Result<i64> {
        self.quotas.get(&task).copied().ok_or(Error::MissingQuota(task))
    }

    pub fn quota_for_district(&self, store: &DistrictStore, id: ElectorateId) -> Result<i64> {
        self.quota_for_type(self.district_type(store, id)?)
    }

    /// Percentage variation of `population` from `quota`, rounded to the
    /// nearest integer. A non-positive quota yields 0.
    pub fn variation_percent(quota: i64, population: i64) -> i64 {
        if quota <= 0 { return 0 }
        (100.0 * (population - quota) as f64 / quota as f64).round() as i64
    }

    /// Whether `population` deviates from `quota` by at least [`QUOTA_TOLERANCE`].
    pub fn exceeds_tolerance(quota: i64, population: i64) -> bool {
        if quota <= 0 { return true }
        (population - quota).abs() as f64 / quota as f64 >= QUOTA_TOLERANCE
    }

    pub fn district_type(&self, store: &DistrictStore, id: ElectorateId) -> Result<Task> {
        Ok(store.electorate(id)?.task)
    }

    #[inline] pub fn district_type_title(task: Task) -> &'static str { task.title() }

    /// Sorted, distinct electorate codes.
    pub fn district_list(&self, store: &DistrictStore) -> Result<Vec<String>> {
        let mut codes = store.electorates()?.into_iter()
            .map(|electorate| electorate.code)
            .collect::<Vec<_>>();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    pub fn estimated_population(&self, store: &DistrictStore, id: ElectorateId) -> Result<Option<i64>> {
        Ok(store.electorate(id)?.estimated_pop)
    }

    /// Variation of an electorate's estimated population from its type's quota.
    pub fn estimated_variation(&self, store: &DistrictStore, id: ElectorateId) -> Result<Option<i64>> {
        let electorate = store.electorate(id)?;
        let quota = self.quota_for_type(electorate.task)?;
        Ok(electorate.estimated_pop.map(|pop| Self::variation_percent(quota, pop)))
    }
}
