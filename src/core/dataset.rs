use crate::core::errors::{FitError, FitResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Features, targets and optional per-row weights of one training or test set.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub targets: Array2<f64>,
    pub sample_weight: Option<Array1<f64>>,
    pub feature_names: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawDataset {
    features: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
    #[serde(default)]
    sample_weight: Option<Vec<f64>>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

impl Dataset {
    pub fn new(features: Array2<f64>, targets: Array2<f64>) -> FitResult<Self> {
        check_same_rows(features.nrows(), targets.nrows())?;
        Ok(Self {
            features,
            targets,
            sample_weight: None,
            feature_names: None,
        })
    }

    pub fn with_sample_weight(mut self, weights: Array1<f64>) -> FitResult<Self> {
        check_sample_weight(self.features.nrows(), Some(weights.view()))?;
        self.sample_weight = Some(weights);
        Ok(self)
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> FitResult<Self> {
        if names.len() != self.features.ncols() {
            return Err(FitError::shape(
                format!("{} feature names", self.features.ncols()),
                format!("{} feature names", names.len()),
            ));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.targets.ncols()
    }

    /// Reads `{"features": [[..]], "targets": [[..]], "sample_weight"?, "feature_names"?}`.
    pub fn from_json_file(path: &Path) -> FitResult<Self> {
        let file = File::open(path).map_err(|source| FitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawDataset =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| FitError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let features = rows_to_array("features", raw.features)?;
        let targets = rows_to_array("targets", raw.targets)?;
        let mut dataset = Dataset::new(features, targets)?;
        if let Some(weights) = raw.sample_weight {
            dataset = dataset.with_sample_weight(Array1::from(weights))?;
        }
        if let Some(names) = raw.feature_names {
            dataset = dataset.with_feature_names(names)?;
        }
        Ok(dataset)
    }

    /// Targets as non-negative integer class codes, one column per output.
    pub fn class_codes(&self) -> FitResult<Array2<usize>> {
        class_codes_from_real(self.targets.view())
    }

    /// The single target column of a one-output dataset.
    pub fn single_target(&self) -> FitResult<Array1<f64>> {
        if self.targets.ncols() != 1 {
            return Err(FitError::shape(
                "exactly 1 target column",
                format!("{} target columns", self.targets.ncols()),
            ));
        }
        Ok(self.targets.column(0).to_owned())
    }
}

fn rows_to_array(field: &str, rows: Vec<Vec<f64>>) -> FitResult<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() != n_cols {
            return Err(FitError::shape(
                format!("{n_cols} values in every {field} row"),
                format!("{} values in row {i}", row.len()),
            ));
        }
        flat.extend(row);
    }
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| FitError::shape(format!("{n_rows}x{n_cols} {field}"), e.to_string()))
}

pub fn check_same_rows(x_rows: usize, y_rows: usize) -> FitResult<()> {
    if x_rows != y_rows {
        return Err(FitError::shape(
            format!("{x_rows} target rows"),
            format!("{y_rows} target rows"),
        ));
    }
    Ok(())
}

pub fn check_sample_weight(n_rows: usize, weights: Option<ArrayView1<f64>>) -> FitResult<()> {
    let Some(weights) = weights else {
        return Ok(());
    };
    if weights.len() != n_rows {
        return Err(FitError::shape(
            format!("{n_rows} sample weights"),
            format!("{} sample weights", weights.len()),
        ));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(FitError::shape(
            "finite non-negative sample weights",
            "a negative or non-finite weight",
        ));
    }
    Ok(())
}

pub fn check_feature_count(expected: usize, x: ArrayView2<f64>) -> FitResult<()> {
    if x.ncols() != expected {
        return Err(FitError::shape(
            format!("{expected} feature columns"),
            format!("{} feature columns", x.ncols()),
        ));
    }
    Ok(())
}

/// Converts real-valued targets into class codes, rejecting negatives and fractions.
pub fn class_codes_from_real(targets: ArrayView2<f64>) -> FitResult<Array2<usize>> {
    let mut codes = Array2::<usize>::zeros(targets.raw_dim());
    for ((row, column), &value) in targets.indexed_iter() {
        if !value.is_finite() {
            return Err(FitError::InvalidTarget {
                row,
                column,
                value,
                reason: "class codes must be finite",
            });
        }
        if value < 0.0 {
            return Err(FitError::InvalidTarget {
                row,
                column,
                value,
                reason: "class codes must be non-negative",
            });
        }
        if value.fract() != 0.0 {
            return Err(FitError::InvalidTarget {
                row,
                column,
                value,
                reason: "class codes must be integers",
            });
        }
        codes[[row, column]] = value as usize;
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn new_rejects_row_mismatch() {
        let err = Dataset::new(array![[0.0], [1.0]], array![[0.0]]).unwrap_err();
        assert!(matches!(err, FitError::InputShape { .. }));
    }

    #[test]
    fn class_codes_accepts_integral_values() {
        let ds = Dataset::new(array![[0.0], [1.0]], array![[0.0, 2.0], [1.0, 0.0]]).unwrap();
        assert_eq!(ds.class_codes().unwrap(), array![[0usize, 2], [1, 0]]);
    }

    #[test]
    fn class_codes_rejects_negative_and_fractional() {
        let neg = class_codes_from_real(array![[0.0], [-1.0]].view()).unwrap_err();
        assert!(matches!(neg, FitError::InvalidTarget { row: 1, column: 0, .. }));

        let frac = class_codes_from_real(array![[0.5]].view()).unwrap_err();
        assert!(matches!(frac, FitError::InvalidTarget { row: 0, .. }));
    }

    #[test]
    fn single_target_requires_one_column() {
        let ds = Dataset::new(array![[0.0]], array![[0.0, 1.0]]).unwrap();
        assert!(matches!(ds.single_target(), Err(FitError::InputShape { .. })));
    }

    #[test]
    fn sample_weight_length_is_checked() {
        let ds = Dataset::new(array![[0.0], [1.0]], array![[0.0], [1.0]]).unwrap();
        let err = ds.with_sample_weight(array![1.0]).unwrap_err();
        assert!(matches!(err, FitError::InputShape { .. }));
    }

    #[test]
    fn loads_json_dataset() {
        let mut f = NamedTempFile::new().expect("tempfile");
        write!(
            f,
            r#"{{"features": [[0.0, 1.0], [2.0, 3.0]], "targets": [[0], [1]],
                "feature_names": ["a", "b"]}}"#
        )
        .unwrap();

        let ds = Dataset::from_json_file(f.path()).unwrap();
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.n_outputs(), 1);
        assert_eq!(ds.feature_names.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    }

    #[test]
    fn ragged_json_rows_are_rejected() {
        let mut f = NamedTempFile::new().expect("tempfile");
        write!(f, r#"{{"features": [[0.0, 1.0], [2.0]], "targets": [[0], [1]]}}"#).unwrap();

        let err = Dataset::from_json_file(f.path()).unwrap_err();
        assert!(matches!(err, FitError::InputShape { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Dataset::from_json_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, FitError::Io { .. }));
    }
}
