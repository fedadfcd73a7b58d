//! Feature matrix and target vector extracted from the dataset

use crate::error::{HousingError, Result};
use crate::schema::{summarize, FeatureSchema, FeatureSummary};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Rows of schema-ordered features paired with sale prices
#[derive(Debug, Clone)]
pub struct TrainingSet {
    schema: FeatureSchema,
    x: Array2<f64>,
    y: Array1<f64>,
}

impl TrainingSet {
    /// Validate and wrap a feature matrix and target vector
    pub fn new(schema: FeatureSchema, x: Array2<f64>, y: Array1<f64>) -> Result<Self> {
        if x.ncols() != schema.len() {
            return Err(HousingError::DataShape(format!(
                "expected {} feature columns, got {}",
                schema.len(),
                x.ncols()
            )));
        }
        if x.nrows() != y.len() {
            return Err(HousingError::DataShape(format!(
                "feature rows ({}) and target length ({}) differ",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(HousingError::DataShape("training set is empty".to_string()));
        }

        if let Some(((row, col), value)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(HousingError::DataShape(format!(
                "feature {} has non-finite value {} at row {}",
                schema.fields()[col].name,
                value,
                row
            )));
        }
        if let Some((row, value)) = y.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(HousingError::DataShape(format!(
                "target must be finite and non-negative, got {} at row {}",
                value, row
            )));
        }

        Ok(Self { schema, x, y })
    }

    /// Select the schema columns and the target from a frame by name
    pub fn from_dataframe(df: &DataFrame, schema: &FeatureSchema, target_column: &str) -> Result<Self> {
        let names = schema.names();
        let x = columns_to_array2(df, &names)?;
        let y = Array1::from_vec(column_values(df, target_column)?);
        Self::new(schema.clone(), x, y)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn feature_summaries(&self) -> Vec<FeatureSummary> {
        summarize(&self.schema, &self.x)
    }
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| HousingError::DataShape(format!("missing column: {}", name)))?;

    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| HousingError::DataShape(format!("column {} is not numeric: {}", name, e)))?;

    casted
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                HousingError::DataShape(format!("column {} has a missing value at row {}", name, row))
            })
        })
        .collect()
}

/// Extract named columns into a row-major matrix
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let missing: Vec<&str> = col_names
        .iter()
        .map(String::as_str)
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(HousingError::DataShape(format!(
            "missing feature columns: {}",
            missing.join(", ")
        )));
    }

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((df.height(), col_names.len()), |(r, c)| {
        col_data[c][r]
    }))
}
