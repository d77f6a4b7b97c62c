//! Tabular dataset loading for the trainer.
//!
//! Input is a delimited text file with a header row; one named column is
//! the numeric prediction target, every other column is a feature. The
//! reference wine-quality file is `;`-delimited, so the delimiter is
//! configurable.

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Error, Result};

/// An in-memory numeric table split into features and a target column.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    target_name: String,
    /// Row-major feature matrix, `rows × feature_names.len()`.
    features: Vec<Vec<f64>>,
    target: Vec<f64>,
}

impl Dataset {
    /// Load a dataset from a delimited text file.
    ///
    /// # Arguments
    ///
    /// * `path` - File with a header row and numeric cells
    /// * `delimiter` - Field delimiter byte (`b';'` for the wine data)
    /// * `target_column` - Header name of the prediction target
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatasetNotFound`] when the file is missing, and
    /// [`Error::Dataset`] when the target column is absent, a cell is
    /// not numeric, or the table has no rows.
    pub fn from_delimited_path(
        path: impl AsRef<Path>,
        delimiter: u8,
        target_column: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatasetNotFound(path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let target_idx = headers
            .iter()
            .position(|h| h == target_column)
            .ok_or_else(|| {
                Error::Dataset(format!(
                    "target column {target_column:?} not found in header {headers:?}"
                ))
            })?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != target_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let mut features = Vec::new();
        let mut target = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = Vec::with_capacity(feature_names.len());
            for (col_idx, cell) in record.iter().enumerate() {
                let value: f64 = cell.parse().map_err(|_| {
                    Error::Dataset(format!(
                        "non-numeric cell {cell:?} at row {row_idx}, column {:?}",
                        headers.get(col_idx).map_or("?", String::as_str)
                    ))
                })?;
                if col_idx == target_idx {
                    target.push(value);
                } else {
                    row.push(value);
                }
            }
            if row.len() != feature_names.len() {
                return Err(Error::Dataset(format!(
                    "row {row_idx} has {} fields, expected {}",
                    row.len() + 1,
                    feature_names.len() + 1
                )));
            }
            features.push(row);
        }

        if features.is_empty() {
            return Err(Error::Dataset(format!(
                "{} contains a header but no rows",
                path.display()
            )));
        }

        tracing::debug!(
            path = %path.display(),
            rows = features.len(),
            features = feature_names.len(),
            target = target_column,
            "loaded dataset"
        );

        Ok(Self {
            feature_names,
            target_name: target_column.to_string(),
            features,
            target,
        })
    }

    /// Build a dataset from already-parsed columns (used by tests and
    /// synthetic data helpers).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] when row lengths are inconsistent or
    /// the table is empty.
    pub fn from_parts(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        features: Vec<Vec<f64>>,
        target: Vec<f64>,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::Dataset("empty dataset".to_string()));
        }
        if features.len() != target.len() {
            return Err(Error::Dataset(format!(
                "{} feature rows but {} target values",
                features.len(),
                target.len()
            )));
        }
        if features.iter().any(|row| row.len() != feature_names.len()) {
            return Err(Error::Dataset("ragged feature rows".to_string()));
        }
        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            features,
            target,
        })
    }

    /// Feature column names, in file order (target excluded).
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Name of the target column.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Target column values.
    #[must_use]
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.features.len()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Split into `(train, test)` with a seeded shuffle.
    ///
    /// The same `(test_fraction, seed)` pair always produces the same
    /// partition. The test side gets `ceil(rows * test_fraction)` rows,
    /// clamped so both sides keep at least one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] for a dataset with fewer than two
    /// rows, which cannot be partitioned into two non-empty sides.
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        let n = self.n_rows();
        if n < 2 {
            return Err(Error::Dataset(format!(
                "cannot split {n} row(s) into train and test"
            )));
        }
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw_test = (n as f64 * test_fraction).ceil() as usize;
        let n_test = raw_test.clamp(1, n - 1);

        let (test_idx, train_idx) = indices.split_at(n_test);
        Ok((self.take(train_idx), self.take(test_idx)))
    }

    fn take(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write fixture");
        file
    }

    #[test]
    fn test_load_semicolon_delimited() {
        let file = write_fixture("a;b;quality\n1.0;2.0;5\n3.0;4.0;6\n");
        let ds = Dataset::from_delimited_path(file.path(), b';', "quality").unwrap();
        assert_eq!(ds.feature_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.target(), &[5.0, 6.0]);
        assert_eq!(ds.features()[1], vec![3.0, 4.0]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Dataset::from_delimited_path("/no/such/file.csv", b',', "y").unwrap_err();
        assert!(matches!(err, Error::DatasetNotFound(_)));
    }

    #[test]
    fn test_missing_target_column() {
        let file = write_fixture("a,b\n1,2\n");
        let err = Dataset::from_delimited_path(file.path(), b',', "quality").unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_non_numeric_cell() {
        let file = write_fixture("a,y\noops,2\n");
        let err = Dataset::from_delimited_path(file.path(), b',', "y").unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_header_only_file_rejected() {
        let file = write_fixture("a,y\n");
        let err = Dataset::from_delimited_path(file.path(), b',', "y").unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_split_is_deterministic() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let target: Vec<f64> = (0..20).map(f64::from).collect();
        let ds = Dataset::from_parts(vec!["x".to_string()], "y", rows, target).unwrap();

        let (train_a, test_a) = ds.train_test_split(0.25, 7).unwrap();
        let (train_b, test_b) = ds.train_test_split(0.25, 7).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a.n_rows() + test_a.n_rows(), 20);
        assert_eq!(test_a.n_rows(), 5);
    }

    #[test]
    fn test_split_keeps_both_sides_nonempty() {
        let ds = Dataset::from_parts(
            vec!["x".to_string()],
            "y",
            vec![vec![1.0], vec![2.0]],
            vec![1.0, 2.0],
        )
        .unwrap();
        let (train, test) = ds.train_test_split(0.9, 0).unwrap();
        assert!(train.n_rows() >= 1);
        assert!(test.n_rows() >= 1);
    }

    #[test]
    fn test_single_row_cannot_be_split() {
        let ds = Dataset::from_parts(
            vec!["x".to_string()],
            "y",
            vec![vec![1.0]],
            vec![1.0],
        )
        .unwrap();
        let err = ds.train_test_split(0.25, 42).unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }
}
