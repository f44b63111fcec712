use crate::error::{Result, RoiError};

/// Time × region matrix of mean signals, stored column-wise.
///
/// Rows are time points in acquisition order. Column order is whatever the
/// producer chose; only reconciliation imposes ascending label order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSignals {
    n_timepoints: usize,
    labels: Vec<u32>,
    columns: Vec<Vec<f64>>,
}

impl RegionSignals {
    pub fn new(n_timepoints: usize) -> Self {
        Self {
            n_timepoints,
            labels: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Append one region's signal. Labels must be unique and the column must
    /// have one value per time point.
    pub fn push_column(&mut self, label: u32, values: Vec<f64>) -> Result<()> {
        if values.len() != self.n_timepoints {
            return Err(RoiError::InvalidParameter(format!(
                "Region {} has {} values, expected {}",
                label,
                values.len(),
                self.n_timepoints
            )));
        }
        if self.labels.contains(&label) {
            return Err(RoiError::InvalidParameter(format!(
                "Region {} appears more than once",
                label
            )));
        }
        self.labels.push(label);
        self.columns.push(values);
        Ok(())
    }

    pub fn n_timepoints(&self) -> usize {
        self.n_timepoints
    }

    pub fn n_regions(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn column(&self, label: u32) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|&l| l == label)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Values of one time point across all columns, in column order.
    pub fn row(&self, t: usize) -> Vec<f64> {
        self.columns.iter().map(|column| column[t]).collect()
    }

    pub(crate) fn into_columns(self) -> impl Iterator<Item = (u32, Vec<f64>)> {
        self.labels.into_iter().zip(self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_column_length_mismatch() {
        let mut signals = RegionSignals::new(3);
        assert!(signals.push_column(1, vec![1.0, 2.0]).is_err());
        assert_eq!(signals.n_regions(), 0);
    }

    #[test]
    fn test_push_column_duplicate() {
        let mut signals = RegionSignals::new(1);
        signals.push_column(4, vec![1.0]).unwrap();
        assert!(signals.push_column(4, vec![2.0]).is_err());
    }

    #[test]
    fn test_row_follows_column_order() {
        let mut signals = RegionSignals::new(2);
        signals.push_column(9, vec![1.0, 2.0]).unwrap();
        signals.push_column(3, vec![5.0, 6.0]).unwrap();
        assert_eq!(signals.row(1), vec![2.0, 6.0]);
        assert_eq!(signals.column(3), Some(&[5.0, 6.0][..]));
        assert_eq!(signals.column(1), None);
    }
}
