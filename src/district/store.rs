use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    concordance::{deformat_electorate_id, PopulationRow},
    district::ElectorateSchema,
    error::{Error, Result},
    store::{Feature, FeatureTable},
    types::{ElectorateId, FeatureId, Task, Value},
};

/// A typed snapshot of one electorate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electorate {
    #[serde(rename = "electorate_id")]
    pub id: ElectorateId,
    #[serde(rename = "type")]
    pub task: Task,
    pub code: String,
    pub name: String,
    pub expected_regions: Option<i64>,
    #[serde(default)]
    pub deprecated: bool,
    pub estimated_pop: Option<i64>,
    pub stats_nz_pop: Option<i64>,
    pub stats_nz_var_20: Option<f64>,
    pub stats_nz_var_23: Option<f64>,
    #[serde(default)]
    pub invalid: bool,
    pub invalid_reason: Option<String>,
}

impl Electorate {
    pub fn new(id: ElectorateId, task: Task, code: &str, name: &str) -> Self {
        Self {
            id,
            task,
            code: code.to_string(),
            name: name.to_string(),
            expected_regions: None,
            deprecated: false,
            estimated_pop: None,
            stats_nz_pop: None,
            stats_nz_var_20: None,
            stats_nz_var_23: None,
            invalid: false,
            invalid_reason: None,
        }
    }

    pub fn with_expected_regions(mut self, regions: i64) -> Self {
        self.expected_regions = Some(regions);
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn with_estimated_pop(mut self, pop: i64) -> Self {
        self.estimated_pop = Some(pop);
        self
    }
}

/// The electorate (district) layer: a feature table plus its resolved schema.
#[derive(Debug, Clone)]
pub struct DistrictStore {
    table: FeatureTable,
    schema: ElectorateSchema,
}

impl DistrictStore {
    /// Wrap an existing table, resolving its schema.
    pub fn new(table: FeatureTable) -> Result<Self> {
        let schema = ElectorateSchema::resolve(&table)?;
        Ok(Self { table, schema })
    }

    /// An empty store with the standard field layout.
    pub fn empty() -> Self {
        Self {
            table: FeatureTable::new("electorates", ElectorateSchema::FIELDS),
            schema: ElectorateSchema::standard(),
        }
    }

    #[inline] pub fn table(&self) -> &FeatureTable { &self.table }
    #[inline] pub fn table_mut(&mut self) -> &mut FeatureTable { &mut self.table }
    #[inline] pub fn schema(&self) -> &ElectorateSchema { &self.schema }
    #[inline] pub fn len(&self) -> usize { self.table.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.table.is_empty() }

    /// Add an electorate record; ids must be unique.
    pub fn add_electorate(&mut self, electorate: &Electorate, geometry: Option<MultiPolygon<f64>>) -> Result<FeatureId> {
        if self.find(electorate.id).is_some() {
            return Err(Error::consistency(format!("electorate {} appears more than once", electorate.id)))
        }
        let s = &self.schema;
        let mut attributes = vec![Value::Null; self.table.fields().len()];
        attributes[s.electorate_id] = Value::Int(electorate.id.0);
        attributes[s.electorate_type] = Value::from(electorate.task.code());
        attributes[s.code] = Value::from(electorate.code.as_str());
        attributes[s.name] = Value::from(electorate.name.as_str());
        attributes[s.expected_regions] = Value::from(electorate.expected_regions);
        attributes[s.deprecated] = Value::Bool(electorate.deprecated);
        attributes[s.estimated_pop] = Value::from(electorate.estimated_pop);
        attributes[s.stats_nz_pop] = Value::from(electorate.stats_nz_pop);
        attributes[s.stats_nz_var_20] = Value::from(electorate.stats_nz_var_20);
        attributes[s.stats_nz_var_23] = Value::from(electorate.stats_nz_var_23);
        attributes[s.invalid] = Value::Bool(electorate.invalid);
        attributes[s.invalid_reason] = Value::from(electorate.invalid_reason.clone());
        Ok(self.table.add_feature(attributes, geometry))
    }

    fn find(&self, id: ElectorateId) -> Option<FeatureId> {
        self.table.features()
            .find(|(_, feature)| feature.attributes[self.schema.electorate_id].as_i64() == Some(id.0))
            .map(|(fid, _)| fid)
    }

    /// Feature id of an electorate.
    pub fn feature_id(&self, id: ElectorateId) -> Result<FeatureId> {
        self.find(id).ok_or(Error::UnknownElectorate(id))
    }

    fn read(&self, feature: &Feature) -> Result<Electorate> {
        let s = &self.schema;
        let attr = |field: usize| &feature.attributes[field];
        let id = attr(s.electorate_id).as_i64()
            .ok_or_else(|| Error::consistency("electorate without an id"))?;
        let task = attr(s.electorate_type).as_str().unwrap_or_default().parse::<Task>()?;
        Ok(Electorate {
            id: ElectorateId(id),
            task,
            code: attr(s.code).as_str().unwrap_or_default().to_string(),
            name: attr(s.name).as_str().unwrap_or_default().to_string(),
            expected_regions: attr(s.expected_regions).as_i64(),
            deprecated: attr(s.deprecated).as_bool(),
            estimated_pop: attr(s.estimated_pop).as_i64(),
            stats_nz_pop: attr(s.stats_nz_pop).as_i64(),
            stats_nz_var_20: attr(s.stats_nz_var_20).as_f64(),
            stats_nz_var_23: attr(s.stats_nz_var_23).as_f64(),
            invalid: attr(s.invalid).as_bool(),
            invalid_reason: attr(s.invalid_reason).as_str().map(str::to_string),
        })
    }

    /// Typed snapshot of one electorate.
    pub fn electorate(&self, id: ElectorateId) -> Result<Electorate> {
        let fid = self.feature_id(id)?;
        self.table.feature(fid).ok_or(Error::UnknownFeature(fid)).and_then(|f| self.read(f))
    }

    /// Every electorate, in feature order.
    pub fn electorates(&self) -> Result<Vec<Electorate>> {
        self.table.features().map(|(_, feature)| self.read(feature)).collect()
    }

    /// Ids of every electorate of type `task`, in feature order.
    pub fn electorate_ids(&self, task: Task) -> Result<Vec<ElectorateId>> {
        Ok(self.electorates()?.into_iter()
            .filter(|electorate| electorate.task == task)
            .map(|electorate| electorate.id)
            .collect())
    }

    pub fn geometry(&self, id: ElectorateId) -> Result<Option<&MultiPolygon<f64>>> {
        Ok(self.table.geometry(self.feature_id(id)?))
    }

    /// Mark an electorate's official statistics as pending a refresh.
    pub fn flag_stats_updating(&mut self, id: ElectorateId) -> Result<()> {
        let fid = self.feature_id(id)?;
        for field in [self.schema.stats_nz_pop, self.schema.stats_nz_var_20, self.schema.stats_nz_var_23] {
            self.table.change_attribute_value(fid, field, Value::Null)?;
        }
        Ok(())
    }

    /// Store official statistics for one electorate.
    pub fn update_stats_values(&mut self, id: ElectorateId, row: &PopulationRow) -> Result<()> {
        let fid = self.feature_id(id)?;
        self.table.change_attribute_value(fid, self.schema.stats_nz_pop, Value::from(row.current_population))?;
        self.table.change_attribute_value(fid, self.schema.stats_nz_var_20, Value::from(row.variance_year_1))?;
        self.table.change_attribute_value(fid, self.schema.stats_nz_var_23, Value::from(row.variance_year_2))?;
        Ok(())
    }

    /// Store every row of a population table. Rows naming unknown
    /// electorates are skipped; returns the number of electorates updated.
    /// Every code is parsed before anything is written.
    pub fn apply_population_table(&mut self, rows: &[PopulationRow]) -> Result<usize> {
        let parsed = rows.iter()
            .map(|row| {
                let id = deformat_electorate_id(&row.electorate)?
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidCode(row.electorate.clone()))?;
                Ok((ElectorateId(id), row))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut updated = 0;
        for (id, row) in parsed {
            match self.update_stats_values(id, row) {
                Ok(()) => updated += 1,
                Err(Error::UnknownElectorate(id)) => warn!("population row for unknown electorate {id}"),
                Err(e) => return Err(e),
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DistrictStore {
        let mut store = DistrictStore::empty();
        store.add_electorate(&Electorate::new(ElectorateId(1), Task::GeneralNorth, "GN01", "Northland").with_estimated_pop(100), None).unwrap();
        store.add_electorate(&Electorate::new(ElectorateId(2), Task::GeneralSouth, "GS02", "Dunedin"), None).unwrap();
        store.add_electorate(&Electorate::new(ElectorateId(3), Task::GeneralNorth, "GN03", "Wellington"), None).unwrap();
        store
    }

    #[test]
    fn typed_snapshot_round_trips() {
        let store = store();
        let electorate = store.electorate(ElectorateId(1)).unwrap();
        assert_eq!(electorate.code, "GN01");
        assert_eq!(electorate.estimated_pop, Some(100));
        assert!(!electorate.invalid);
        assert!(matches!(store.electorate(ElectorateId(9)), Err(Error::UnknownElectorate(ElectorateId(9)))));
    }

    #[test]
    fn ids_by_task() {
        let store = store();
        assert_eq!(store.electorate_ids(Task::GeneralNorth).unwrap(), vec![ElectorateId(1), ElectorateId(3)]);
        assert!(store.electorate_ids(Task::Maori).unwrap().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut store = store();
        let result = store.add_electorate(&Electorate::new(ElectorateId(1), Task::Maori, "M01", "x"), None);
        assert!(matches!(result, Err(Error::DataConsistency(_))));
    }

    #[test]
    fn unknown_type_is_reported() {
        let mut store = store();
        let fid = store.feature_id(ElectorateId(2)).unwrap();
        let field = store.schema().electorate_type;
        store.table_mut().change_attribute_value(fid, field, Value::from("X")).unwrap();
        assert!(matches!(store.electorate(ElectorateId(2)), Err(Error::UnknownDistrictType(_))));
    }

    #[test]
    fn stats_flag_and_update() {
        let mut store = store();
        let row = PopulationRow {
            electorate: "N01".into(),
            current_population: Some(61000),
            variance_year_1: Some(1.5),
            variance_year_2: Some(-2.0),
        };
        assert_eq!(store.apply_population_table(&[row]).unwrap(), 1);
        let electorate = store.electorate(ElectorateId(1)).unwrap();
        assert_eq!(electorate.stats_nz_pop, Some(61000));
        assert_eq!(electorate.stats_nz_var_23, Some(-2.0));

        store.flag_stats_updating(ElectorateId(1)).unwrap();
        let electorate = store.electorate(ElectorateId(1)).unwrap();
        assert_eq!(electorate.stats_nz_pop, None);
        assert_eq!(electorate.stats_nz_var_20, None);
    }

    #[test]
    fn population_rows_for_unknown_electorates_are_skipped() {
        let mut store = store();
        let row = PopulationRow { electorate: "N44".into(), current_population: Some(1), variance_year_1: None, variance_year_2: None };
        assert_eq!(store.apply_population_table(&[row]).unwrap(), 0);
    }

    #[test]
    fn bad_code_after_good_row_writes_nothing() {
        let mut store = store();
        let good = PopulationRow { electorate: "N01".into(), current_population: Some(61000), variance_year_1: None, variance_year_2: None };
        let bad = PopulationRow { electorate: "X?".into(), current_population: Some(1), variance_year_1: None, variance_year_2: None };
        assert!(matches!(store.apply_population_table(&[good, bad]), Err(Error::InvalidCode(_))));
        assert_eq!(store.electorate(ElectorateId(1)).unwrap().stats_nz_pop, None);
    }
}
