//! Maps each template to a scalar physical parameter, and parameter values
//! to one of K contiguous bins over the templates' value range.
use crate::files::bank::TemplateBank;
use ndarray::{Array1, Zip};
use ndarray_stats::{QuantileExt, errors::MinMaxError};
use thiserror::Error;
use trigfit_common::{BinIndex, Real};

#[derive(Debug, Error)]
pub(crate) enum BinningError {
    #[error("cannot determine the bin range: {0}")]
    Range(#[from] MinMaxError),
    #[error("bin count must be non-zero")]
    ZeroBins,
}

/// The physical parameter a template bank is binned over, derived from the
/// component masses and aligned spins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum BinParameter {
    Mchirp,
    Mtotal,
    Eta,
    ChiEff,
}

impl BinParameter {
    /// Derives one scalar per template.
    pub(crate) fn derive(self, bank: &TemplateBank) -> Array1<Real> {
        let masses = Zip::from(&bank.mass1).and(&bank.mass2);
        match self {
            Self::Mchirp => masses
                .map_collect(|&m1, &m2| (m1 * m2).powf(0.6) / (m1 + m2).powf(0.2)),
            Self::Mtotal => masses.map_collect(|&m1, &m2| m1 + m2),
            Self::Eta => masses.map_collect(|&m1, &m2| m1 * m2 / ((m1 + m2) * (m1 + m2))),
            Self::ChiEff => masses
                .and(&bank.spin1z)
                .and(&bank.spin2z)
                .map_collect(|&m1, &m2, &s1z, &s2z| (m1 * s1z + m2 * s2z) / (m1 + m2)),
        }
    }
}

/// K contiguous partitions of a `[lo, hi]` value range, linear or
/// log-spaced. Pure and deterministic.
#[derive(Debug, Clone)]
pub(crate) struct ParameterBins {
    lo: Real,
    hi: Real,
    count: usize,
    log_spaced: bool,
}

impl ParameterBins {
    /// Bins spanning the full range of `values`.
    pub(crate) fn over(
        values: &Array1<Real>,
        count: usize,
        log_spaced: bool,
    ) -> Result<Self, BinningError> {
        if count == 0 {
            return Err(BinningError::ZeroBins);
        }
        Ok(Self {
            lo: *values.min()?,
            hi: *values.max()?,
            count,
            log_spaced,
        })
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Bin index of `value`, clamped to `[0, K-1]` so that `value == hi`
    /// lands in the last bin rather than one past it.
    pub(crate) fn index_of(&self, value: Real) -> BinIndex {
        let (value, lo, hi) = if self.log_spaced {
            (value.ln(), self.lo.ln(), self.hi.ln())
        } else {
            (value, self.lo, self.hi)
        };
        let raw = ((value - lo) / (hi - lo) * self.count as Real).floor() as isize;
        raw.clamp(0, self.count as isize - 1) as BinIndex
    }
}
