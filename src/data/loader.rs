//! Dataset loading

use crate::error::{HousingError, Result};
use crate::schema::FeatureSchema;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::TrainingSet;

/// CSV loader for the cleaned housing dataset
pub struct DataLoader {
    /// Field separator
    delimiter: u8,
    /// Rows used to infer column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: 1000,
        }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set how many rows are scanned to infer column types
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path)?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                HousingError::DataShape(format!("failed to parse {}: {}", path.display(), e))
            })?;

        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Load a CSV and extract the schema columns and target by name
    pub fn load_training_set(
        &self,
        path: impl AsRef<Path>,
        schema: &FeatureSchema,
        target_column: &str,
    ) -> Result<TrainingSet> {
        let path = path.as_ref();
        let df = self.load_csv(path)?;
        let set = TrainingSet::from_dataframe(&df, schema, target_column)?;
        info!(
            path = %path.display(),
            samples = set.n_samples(),
            features = set.n_features(),
            ignored_columns = df.width().saturating_sub(set.n_features() + 1),
            "Training set ready"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_with_extra_columns() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "PARCELNO,LND_SQFOOT,SALE_PRC").unwrap();
        for i in 1..=5 {
            writeln!(tmp.as_file(), "{},{},{}", 1000 + i, i * 100, i * 1000).unwrap();
        }
        tmp.as_file().flush().unwrap();

        let schema = FeatureSchema::new(["LND_SQFOOT"]).unwrap();
        let set = DataLoader::new()
            .load_training_set(tmp.path(), &schema, "SALE_PRC")
            .unwrap();

        assert_eq!(set.n_samples(), 5);
        assert_eq!(set.n_features(), 1);
        assert_eq!(set.x()[[2, 0]], 300.0);
        assert_eq!(set.y()[4], 5000.0);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = DataLoader::new()
            .load_csv("/nonexistent/cleaned_miami_housing.csv")
            .unwrap_err();
        assert!(matches!(err, HousingError::Io(_)));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "a;SALE_PRC").unwrap();
        writeln!(tmp.as_file(), "1;10").unwrap();
        writeln!(tmp.as_file(), "2;20").unwrap();
        tmp.as_file().flush().unwrap();

        let df = DataLoader::new().with_delimiter(b';').load_csv(tmp.path()).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.height(), 2);
    }
}
