//! Normalized input table.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::error::{Result, ValidityError};

/// An immutable, already-scaled feature table: one row per entity.
///
/// Column names and row ids only label output; scoring never reads them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDataset {
    values: Array2<f64>,
    columns: Vec<String>,
    row_ids: Vec<String>,
}

impl NormalizedDataset {
    /// Wraps a feature matrix with default column names and row ids.
    pub fn from_array(values: Array2<f64>) -> Result<Self> {
        let (n_rows, n_features) = values.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(ValidityError::InvalidInput(format!(
                "dataset must have at least one row and one column, got {n_rows}x{n_features}"
            )));
        }
        if let Some(((row, col), v)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidityError::InvalidInput(format!(
                "non-finite value {v} at row {row}, column {col}"
            )));
        }
        Ok(Self {
            columns: (0..n_features).map(|i| format!("feature_{i}")).collect(),
            row_ids: (0..n_rows).map(|i| i.to_string()).collect(),
            values,
        })
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(ValidityError::InvalidInput(format!(
                "row {i} has {} values, expected {n_features}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), n_features), flat)
            .map_err(|e| ValidityError::InvalidInput(e.to_string()))?;
        Self::from_array(values)
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: Vec<S>) -> Result<Self> {
        if columns.len() != self.n_features() {
            return Err(ValidityError::InvalidInput(format!(
                "got {} column names for {} features",
                columns.len(),
                self.n_features()
            )));
        }
        self.columns = columns.into_iter().map(Into::into).collect();
        Ok(self)
    }

    pub fn with_row_ids<S: Into<String>>(mut self, row_ids: Vec<S>) -> Result<Self> {
        if row_ids.len() != self.n_rows() {
            return Err(ValidityError::InvalidInput(format!(
                "got {} row ids for {} rows",
                row_ids.len(),
                self.n_rows()
            )));
        }
        self.row_ids = row_ids.into_iter().map(Into::into).collect();
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn n_features(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    /// Looks up a feature column by name.
    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self.column_index(name)?;
        Ok(self.values.column(idx))
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ValidityError::InvalidInput(format!("unknown column '{name}'")))
    }

    /// Fails unless there are at least `min_rows` rows.
    pub fn require_rows(&self, min_rows: usize) -> Result<()> {
        if self.n_rows() < min_rows {
            return Err(ValidityError::InvalidInput(format!(
                "dataset has {} rows, need at least {min_rows}",
                self.n_rows()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_rows_keeps_order() {
        let ds = NormalizedDataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.view()[[2, 0]], 5.0);
        assert_eq!(ds.columns(), &["feature_0", "feature_1"]);
        assert_eq!(ds.row_ids(), &["0", "1", "2"]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = NormalizedDataset::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, ValidityError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_and_nan_rejected() {
        assert!(NormalizedDataset::from_rows(&[]).is_err());
        assert!(NormalizedDataset::from_array(array![[0.0, f64::NAN]]).is_err());
    }

    #[test]
    fn test_named_column_lookup() {
        let ds = NormalizedDataset::from_array(array![[0.1, 0.2], [0.3, 0.4]])
            .unwrap()
            .with_columns(vec!["price_change_24h", "price_change_7d"])
            .unwrap()
            .with_row_ids(vec!["bitcoin", "ethereum"])
            .unwrap();
        assert_eq!(ds.column("price_change_7d").unwrap().to_vec(), vec![0.2, 0.4]);
        assert!(ds.column("market_cap").is_err());
        assert_eq!(ds.row_ids()[1], "ethereum");
    }

    #[test]
    fn test_require_rows() {
        let ds = NormalizedDataset::from_array(array![[0.0]]).unwrap();
        assert!(ds.require_rows(1).is_ok());
        assert!(ds.require_rows(2).is_err());
    }
}
