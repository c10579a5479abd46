//! Data loading utilities

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{read_arff, Attribute, Dataset};
use crate::error::{MultiViewError, Result};

/// On-disk format of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Arff,
    Csv,
    Tsv,
}

impl SourceFormat {
    /// Detect the format from the file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "arff" => SourceFormat::Arff,
            "tsv" => SourceFormat::Tsv,
            _ => SourceFormat::Csv,
        }
    }
}

/// Loads one view's dataset from disk
///
/// The last column/attribute is always the class.
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Strings treated as missing values in delimited files
    null_value: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            null_value: "?".to_string(),
        }
    }

    /// Set the token treated as a missing value in CSV/TSV files
    pub fn with_null_value(mut self, token: impl Into<String>) -> Self {
        self.null_value = token.into();
        self
    }

    /// Detect file format from extension and load
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        match SourceFormat::from_path(path) {
            SourceFormat::Arff => read_arff(path),
            SourceFormat::Csv => self.load_delimited(path, b','),
            SourceFormat::Tsv => self.load_delimited(path, b'\t'),
        }
    }

    /// Load a delimited file with a header row
    pub fn load_delimited(&self, path: &Path, delimiter: u8) -> Result<Dataset> {
        let file = File::open(path)
            .map_err(|e| MultiViewError::DatasetLoad(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default()
            .with_separator(delimiter)
            .with_null_values(Some(NullValues::AllColumnsSingle(self.null_value.as_str().into())));

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| MultiViewError::DatasetLoad(format!("{}: {}", path.display(), e)))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        dataset_from_frame(&name, &df)
    }

    /// Load a dataset and describe it without running any classification
    pub fn summarize(&self, path: impl AsRef<Path>) -> Result<DatasetSummary> {
        let dataset = self.load(path)?;
        Ok(DatasetSummary::of(&dataset))
    }
}

/// Convert a data frame into a dataset; the last column is the class
///
/// Numeric columns become numeric attributes. Any other column becomes a
/// nominal attribute whose values are ordered by first appearance. A numeric
/// class column is ordered by ascending value instead.
pub fn dataset_from_frame(name: &str, df: &DataFrame) -> Result<Dataset> {
    let columns = df.get_columns();
    if columns.len() < 2 {
        return Err(MultiViewError::DatasetLoad(format!(
            "{}: need at least one feature column and a class column",
            name
        )));
    }

    let (feature_cols, class_cols) = columns.split_at(columns.len() - 1);
    let class_col = &class_cols[0];
    let n_rows = df.height();

    let mut attributes = Vec::with_capacity(feature_cols.len());
    let mut features = Array2::<f64>::zeros((n_rows, feature_cols.len()));

    for (j, series) in feature_cols.iter().enumerate() {
        let col_name = series.name().to_string();
        if series.dtype().is_numeric() {
            let cast = series.cast(&DataType::Float64)?;
            for (i, value) in cast.f64()?.into_iter().enumerate() {
                features[[i, j]] = value.unwrap_or(f64::NAN);
            }
            attributes.push(Attribute::numeric(col_name));
        } else {
            let (values, codes) = encode_nominal(series, false)?;
            for (i, code) in codes.into_iter().enumerate() {
                features[[i, j]] = code.map_or(f64::NAN, |c| c as f64);
            }
            attributes.push(Attribute::nominal(col_name, values));
        }
    }

    let (class_values, class_codes) = encode_nominal(class_col, class_col.dtype().is_numeric())?;
    let labels = class_codes
        .into_iter()
        .enumerate()
        .map(|(i, code)| {
            code.ok_or_else(|| {
                MultiViewError::DatasetLoad(format!("{}: row {} has no class value", name, i + 1))
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    let class_attribute = Attribute::nominal(class_col.name().to_string(), class_values);
    Dataset::new(name, attributes, class_attribute, features, labels)
}

/// Map a column onto nominal codes, returning the value list and per-row codes
fn encode_nominal(series: &Series, numeric_order: bool) -> Result<(Vec<String>, Vec<Option<usize>>)> {
    let cast = series.cast(&DataType::String)?;
    let rows: Vec<Option<String>> = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect();

    let mut values: Vec<String> = Vec::new();
    for value in rows.iter().flatten() {
        if !values.contains(value) {
            values.push(value.clone());
        }
    }

    if numeric_order {
        values.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    }

    let index: HashMap<&str, usize> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (v.as_str(), i))
        .collect();
    let codes = rows
        .iter()
        .map(|v| v.as_deref().and_then(|s| index.get(s).copied()))
        .collect();

    Ok((values, codes))
}

/// Short description of a loaded view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub n_instances: usize,
    pub n_features: usize,
    pub n_nominal_features: usize,
    pub class_name: String,
    pub class_counts: Vec<(String, usize)>,
    /// Ensemble size the pipeline would use for this view
    pub ensemble_size: usize,
}

impl DatasetSummary {
    pub fn of(dataset: &Dataset) -> Self {
        let counts = dataset.class_counts();
        Self {
            name: dataset.name().to_string(),
            n_instances: dataset.n_instances(),
            n_features: dataset.n_features(),
            n_nominal_features: dataset.attributes().iter().filter(|a| a.is_nominal()).count(),
            class_name: dataset.class_attribute().name.clone(),
            class_counts: dataset
                .class_names()
                .iter()
                .cloned()
                .zip(counts)
                .collect(),
            ensemble_size: crate::multiview::neighbor_count(dataset.n_instances()).unwrap_or(0),
        }
    }
}
