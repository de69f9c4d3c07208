use std::collections::BTreeMap;

use geo::MultiPolygon;

use crate::{error::{Error, Result}, types::{FeatureId, Value}};

/// A single row of a [`FeatureTable`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    pub attributes: Vec<Value>,
    pub geometry: Option<MultiPolygon<f64>>,
}

/// An in-memory attribute table with optional geometry per row.
///
/// Rows are addressed by [`FeatureId`] and columns by field index,
/// resolved once from field names (see [`FeatureTable::lookup_field`]).
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    name: String,
    fields: Vec<String>,
    features: BTreeMap<FeatureId, Feature>,
}

impl FeatureTable {
    pub fn new<S: Into<String>>(name: &str, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.into_iter().map(Into::into).collect(),
            features: BTreeMap::new(),
        }
    }

    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn fields(&self) -> &[String] { &self.fields }
    #[inline] pub fn len(&self) -> usize { self.features.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    /// Get the index of a field by name.
    #[inline]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    /// Get the index of a field by name, or a schema error naming this table.
    pub fn lookup_field(&self, name: &str) -> Result<usize> {
        self.field_index(name).ok_or_else(|| Error::schema(&self.name, name))
    }

    /// Append a feature with the next free id. Missing attributes are null.
    pub fn add_feature(&mut self, attributes: Vec<Value>, geometry: Option<MultiPolygon<f64>>) -> FeatureId {
        let id = self.features.last_key_value().map_or(FeatureId(0), |(id, _)| FeatureId(id.0 + 1));
        self.insert_feature(id, attributes, geometry);
        id
    }

    /// Insert (or replace) the feature at `id`.
    pub fn insert_feature(&mut self, id: FeatureId, mut attributes: Vec<Value>, geometry: Option<MultiPolygon<f64>>) {
        attributes.resize(self.fields.len(), Value::Null);
        self.features.insert(id, Feature { attributes, geometry });
    }

    #[inline] pub fn contains(&self, id: FeatureId) -> bool { self.features.contains_key(&id) }

    #[inline] pub fn feature(&self, id: FeatureId) -> Option<&Feature> { self.features.get(&id) }

    #[inline] pub(crate) fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> { self.features.get_mut(&id) }

    /// Iterate over features in id order.
    pub fn features(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features.iter().map(|(&id, feature)| (id, feature))
    }

    /// Get an attribute value, if both the feature and the field exist.
    pub fn attribute(&self, id: FeatureId, field: usize) -> Option<&Value> {
        self.features.get(&id)?.attributes.get(field)
    }

    #[inline]
    pub fn geometry(&self, id: FeatureId) -> Option<&MultiPolygon<f64>> {
        self.features.get(&id)?.geometry.as_ref()
    }

    /// Check that `field` is a valid column index.
    pub fn check_field(&self, field: usize) -> Result<()> {
        if field < self.fields.len() { Ok(()) }
        else { Err(Error::schema(&self.name, &format!("#{field}"))) }
    }

    /// Overwrite one attribute value, returning the previous value.
    pub fn change_attribute_value(&mut self, id: FeatureId, field: usize, value: Value) -> Result<Value> {
        self.check_field(field)?;
        let feature = self.features.get_mut(&id).ok_or(Error::UnknownFeature(id))?;
        Ok(std::mem::replace(&mut feature.attributes[field], value))
    }

    /// Overwrite the geometry, returning the previous geometry.
    pub fn change_geometry(&mut self, id: FeatureId, geometry: Option<MultiPolygon<f64>>) -> Result<Option<MultiPolygon<f64>>> {
        let feature = self.features.get_mut(&id).ok_or(Error::UnknownFeature(id))?;
        Ok(std::mem::replace(&mut feature.geometry, geometry))
    }
}
