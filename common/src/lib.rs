use ndarray::{Array1, Axis};
use thiserror::Error;

pub type Real = f64;
pub type GpsTime = f64;
pub type TemplateId = u64;
pub type BinIndex = usize;

#[derive(Debug, Error)]
#[error("parallel columns have inconsistent lengths: {lengths:?}")]
pub struct ColumnLengthMismatch {
    pub lengths: Vec<usize>,
}

/// Per-trigger columns stored as parallel arrays indexed by position.
///
/// Every filtering operation must apply one retained-index set to every
/// column at once, via [TriggerColumns::select]. Mutating columns
/// individually breaks the lock-step invariant checked by
/// [TriggerColumns::check_consistent].
#[derive(Debug, Clone, Default)]
pub struct TriggerColumns {
    pub snr: Array1<Real>,
    pub chisq: Array1<Real>,
    pub chisq_dof: Array1<Real>,
    pub sg_chisq: Option<Array1<Real>>,
    pub template_id: Array1<TemplateId>,
    pub end_time: Array1<GpsTime>,
    pub aux: Option<Array1<Real>>,
}

impl TriggerColumns {
    pub fn len(&self) -> usize {
        self.end_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end_time.is_empty()
    }

    pub fn check_consistent(&self) -> Result<(), ColumnLengthMismatch> {
        let mut lengths = vec![
            self.snr.len(),
            self.chisq.len(),
            self.chisq_dof.len(),
            self.template_id.len(),
            self.end_time.len(),
        ];
        if let Some(sg_chisq) = &self.sg_chisq {
            lengths.push(sg_chisq.len());
        }
        if let Some(aux) = &self.aux {
            lengths.push(aux.len());
        }
        if lengths.iter().all(|&len| len == self.end_time.len()) {
            Ok(())
        } else {
            Err(ColumnLengthMismatch { lengths })
        }
    }

    /// Applies one retained-index set to every column in lock-step.
    pub fn select(&self, keep: &[usize]) -> Self {
        Self {
            snr: self.snr.select(Axis(0), keep),
            chisq: self.chisq.select(Axis(0), keep),
            chisq_dof: self.chisq_dof.select(Axis(0), keep),
            sg_chisq: self
                .sg_chisq
                .as_ref()
                .map(|column| column.select(Axis(0), keep)),
            template_id: self.template_id.select(Axis(0), keep),
            end_time: self.end_time.select(Axis(0), keep),
            aux: self.aux.as_ref().map(|column| column.select(Axis(0), keep)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn columns() -> TriggerColumns {
        TriggerColumns {
            snr: array![6.0, 7.0, 8.0],
            chisq: array![10.0, 20.0, 30.0],
            chisq_dof: array![10.0, 10.0, 10.0],
            sg_chisq: Some(array![1.0, 2.0, 3.0]),
            template_id: array![0, 1, 0],
            end_time: array![100.0, 200.0, 300.0],
            aux: None,
        }
    }

    #[test]
    fn consistent_columns_pass() {
        assert!(columns().check_consistent().is_ok());
    }

    #[test]
    fn short_column_detected() {
        let mut columns = columns();
        columns.chisq = array![10.0, 20.0];
        assert!(columns.check_consistent().is_err());
    }

    #[test]
    fn short_optional_column_detected() {
        let mut columns = columns();
        columns.aux = Some(array![1.0]);
        assert!(columns.check_consistent().is_err());
    }

    #[test]
    fn select_keeps_columns_in_lock_step() {
        let selected = columns().select(&[2, 0]);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.snr, array![8.0, 6.0]);
        assert_eq!(selected.chisq, array![30.0, 10.0]);
        assert_eq!(selected.sg_chisq, Some(array![3.0, 1.0]));
        assert_eq!(selected.template_id, array![0, 0]);
        assert_eq!(selected.end_time, array![300.0, 100.0]);
        assert!(selected.check_consistent().is_ok());
    }

    #[test]
    fn select_nothing_empties_every_column() {
        let selected = columns().select(&[]);
        assert!(selected.is_empty());
        assert!(selected.check_consistent().is_ok());
    }
}
