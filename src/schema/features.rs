//! Feature schema, fingerprints and feature vectors

use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Target column of the housing dataset
pub const TARGET_COLUMN: &str = "SALE_PRC";

/// Bumped whenever the fingerprint input layout changes
const FINGERPRINT_TAG: &str = "miami-housing/schema/v1";

/// Columns of the cleaned Miami dataset used as model inputs, in model order
const MIAMI_FIELDS: [(&str, &str); 13] = [
    ("LND_SQFOOT", "land area (square feet)"),
    ("TOT_LVG_AREA", "floor area (square feet)"),
    ("RAIL_DIST", "distance to the nearest rail line (feet)"),
    ("OCEAN_DIST", "distance to the ocean (feet)"),
    ("WATER_DIST", "distance to the nearest body of water (feet)"),
    ("CNTR_DIST", "distance to the Miami central business district (feet)"),
    ("SUBCNTR_DI", "distance to the nearest subcenter (feet)"),
    ("HWY_DIST", "distance to the nearest highway (feet)"),
    ("age", "age of the structure"),
    ("structure_quality", "quality of the structure"),
    ("avno60plus", "airplane noise above 60 dB (1 = yes, 0 = no)"),
    ("month_sold", "sale month in 2016 (1 = jan)"),
    ("SPEC_FEAT_VAL", "value of special features"),
];

/// A single named model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureField {
    pub name: String,
    pub description: String,
}

/// Stable identity of a schema: SHA-256 over the ordered field names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaFingerprint(String);

impl SchemaFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered set of named numeric features shared by training and inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<FeatureField>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::miami()
    }
}

impl FeatureSchema {
    /// The fixed 13-field schema of the Miami housing model
    pub fn miami() -> Self {
        Self {
            fields: MIAMI_FIELDS
                .iter()
                .map(|(name, description)| FeatureField {
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    /// Build a custom schema from ordered field names
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<FeatureField> = names
            .into_iter()
            .map(|name| FeatureField {
                name: name.into(),
                description: String::new(),
            })
            .collect();

        if fields.is_empty() {
            return Err(HousingError::DataShape(
                "schema needs at least one feature".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(HousingError::DataShape(format!(
                    "duplicate feature name in schema: {}",
                    field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FeatureField] {
        &self.fields
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn fingerprint(&self) -> SchemaFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_TAG.as_bytes());
        for field in &self.fields {
            hasher.update([0u8]);
            hasher.update(field.name.as_bytes());
        }
        SchemaFingerprint(format!("{:x}", hasher.finalize()))
    }

    /// Check that a row of raw values fits this schema
    pub(crate) fn check_row(&self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(HousingError::SchemaMismatch(format!(
                "expected {} features, got {}",
                self.len(),
                values.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(values) {
            if !value.is_finite() {
                return Err(HousingError::SchemaMismatch(format!(
                    "feature {} is not a finite number: {}",
                    field.name, value
                )));
            }
        }
        Ok(())
    }
}

/// One row of model inputs aligned to a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    fingerprint: SchemaFingerprint,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build from values in schema order
    pub fn from_values(schema: &FeatureSchema, values: Vec<f64>) -> Result<Self> {
        schema.check_row(&values)?;
        Ok(Self {
            fingerprint: schema.fingerprint(),
            values,
        })
    }

    /// Build from values addressed by field name. Missing or unknown names are rejected.
    pub fn from_named(schema: &FeatureSchema, named: &BTreeMap<String, f64>) -> Result<Self> {
        let missing: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !named.contains_key(*name))
            .collect();
        let unexpected: Vec<&str> = named
            .keys()
            .map(String::as_str)
            .filter(|name| schema.index_of(name).is_none())
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing fields: {}", missing.join(", ")));
            }
            if !unexpected.is_empty() {
                parts.push(format!("unexpected fields: {}", unexpected.join(", ")));
            }
            return Err(HousingError::SchemaMismatch(parts.join("; ")));
        }

        let values = schema
            .fields()
            .iter()
            .map(|f| named[&f.name])
            .collect();
        Self::from_values(schema, values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn fingerprint(&self) -> &SchemaFingerprint {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named field under `schema`
    pub fn get(&self, schema: &FeatureSchema, name: &str) -> Option<f64> {
        schema.index_of(name).and_then(|i| self.values.get(i).copied())
    }
}

/// Plain record of the 13 Miami model inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HousingFeatures {
    #[serde(rename = "LND_SQFOOT")]
    pub land_sqft: f64,
    #[serde(rename = "TOT_LVG_AREA")]
    pub living_area_sqft: f64,
    #[serde(rename = "RAIL_DIST")]
    pub rail_dist: f64,
    #[serde(rename = "OCEAN_DIST")]
    pub ocean_dist: f64,
    #[serde(rename = "WATER_DIST")]
    pub water_dist: f64,
    #[serde(rename = "CNTR_DIST")]
    pub center_dist: f64,
    #[serde(rename = "SUBCNTR_DI")]
    pub subcenter_dist: f64,
    #[serde(rename = "HWY_DIST")]
    pub highway_dist: f64,
    pub age: f64,
    pub structure_quality: f64,
    pub avno60plus: f64,
    pub month_sold: f64,
    #[serde(rename = "SPEC_FEAT_VAL")]
    pub special_feature_value: f64,
}

impl HousingFeatures {
    /// Values in Miami schema order
    pub fn to_array(&self) -> [f64; 13] {
        [
            self.land_sqft,
            self.living_area_sqft,
            self.rail_dist,
            self.ocean_dist,
            self.water_dist,
            self.center_dist,
            self.subcenter_dist,
            self.highway_dist,
            self.age,
            self.structure_quality,
            self.avno60plus,
            self.month_sold,
            self.special_feature_value,
        ]
    }

    pub fn to_vector(&self) -> Result<FeatureVector> {
        FeatureVector::from_values(&FeatureSchema::miami(), self.to_array().to_vec())
    }

    /// Parse a JSON object keyed by dataset column names
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HousingError::SchemaMismatch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> HousingFeatures {
        HousingFeatures {
            land_sqft: 9375.0,
            living_area_sqft: 1753.0,
            rail_dist: 2815.9,
            ocean_dist: 12811.4,
            water_dist: 347.6,
            center_dist: 42815.3,
            subcenter_dist: 37742.2,
            highway_dist: 15954.9,
            age: 67.0,
            structure_quality: 4.0,
            avno60plus: 0.0,
            month_sold: 8.0,
            special_feature_value: 0.0,
        }
    }

    #[test]
    fn test_miami_schema_order() {
        let schema = FeatureSchema::miami();
        assert_eq!(schema.len(), 13);
        assert_eq!(schema.index_of("LND_SQFOOT"), Some(0));
        assert_eq!(schema.index_of("age"), Some(8));
        assert_eq!(schema.index_of("SPEC_FEAT_VAL"), Some(12));
        assert_eq!(schema.index_of("LATITUDE"), None);
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let a = FeatureSchema::new(["x", "y"]).unwrap();
        let b = FeatureSchema::new(["y", "x"]).unwrap();
        let c = FeatureSchema::new(["x", "y"]).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn test_schema_rejects_duplicates_and_empty() {
        assert!(matches!(
            FeatureSchema::new(["x", "x"]),
            Err(HousingError::DataShape(_))
        ));
        assert!(matches!(
            FeatureSchema::new(Vec::<String>::new()),
            Err(HousingError::DataShape(_))
        ));
    }

    #[test]
    fn test_from_named_missing_age() {
        let schema = FeatureSchema::miami();
        let mut named: BTreeMap<String, f64> = schema
            .names()
            .into_iter()
            .zip(sample_features().to_array())
            .collect();
        named.remove("age");

        match FeatureVector::from_named(&schema, &named) {
            Err(HousingError::SchemaMismatch(msg)) => assert!(msg.contains("age"), "{}", msg),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_from_named_unexpected_field() {
        let schema = FeatureSchema::new(["LND_SQFOOT"]).unwrap();
        let mut named = BTreeMap::new();
        named.insert("LND_SQFOOT".to_string(), 100.0);
        named.insert("LATITUDE".to_string(), 25.8);

        let err = FeatureVector::from_named(&schema, &named).unwrap_err();
        assert!(err.to_string().contains("unexpected fields: LATITUDE"));
    }

    #[test]
    fn test_from_values_rejects_non_finite() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        assert!(FeatureVector::from_values(&schema, vec![1.0, f64::NAN]).is_err());
        assert!(FeatureVector::from_values(&schema, vec![1.0]).is_err());
        assert!(FeatureVector::from_values(&schema, vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_housing_features_json_requires_every_field() {
        let full = serde_json::to_string(&sample_features()).unwrap();
        assert_eq!(HousingFeatures::from_json(&full).unwrap(), sample_features());

        let mut value: serde_json::Value = serde_json::from_str(&full).unwrap();
        value.as_object_mut().unwrap().remove("age");
        let err = HousingFeatures::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, HousingError::SchemaMismatch(_)));
    }

    #[test]
    fn test_to_vector_matches_schema() {
        let schema = FeatureSchema::miami();
        let vector = sample_features().to_vector().unwrap();
        assert_eq!(vector.fingerprint(), &schema.fingerprint());
        assert_eq!(vector.get(&schema, "age"), Some(67.0));
        assert_eq!(vector.get(&schema, "month_sold"), Some(8.0));
    }
}
