//! Maximum-likelihood fits of the statistic distribution above threshold,
//! one per template.
use crate::error::FitError;
use crate::files::results::TemplateFits;
use crate::statistic::RankedTriggers;
use ndarray::Array1;
use tracing::debug;
use trigfit_common::Real;

/// Recorded in place of a fit coefficient when a template has no triggers
/// above threshold. Downstream consumers must not treat it as a fit value.
pub(crate) const NO_FIT_SENTINEL: Real = -100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FittedAlpha {
    pub(crate) alpha: Real,
    pub(crate) sig_alpha: Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum FitFunction {
    Exponential,
    Rayleigh,
    Power,
}

impl FitFunction {
    /// Maximum-likelihood shape parameter of `values` above `threshold`, or
    /// `None` when there is nothing to fit.
    pub(crate) fn fit_above_thresh(self, values: &[Real], threshold: Real) -> Option<FittedAlpha> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as Real;
        let mean = |mapped: fn(Real, Real) -> Real| -> Real {
            values.iter().map(|&value| mapped(value, threshold)).sum::<Real>() / n
        };
        let (alpha, sig_alpha) = match self {
            Self::Exponential => {
                let alpha = 1.0 / (mean(|v, _| v) - threshold);
                (alpha, alpha / n.sqrt())
            }
            Self::Rayleigh => {
                let alpha = 2.0 / (mean(|v, _| v * v) - threshold * threshold);
                (alpha, alpha / n.sqrt())
            }
            Self::Power => {
                let alpha = 1.0 / mean(|v, t| (v / t).ln()) + 1.0;
                (alpha, (alpha - 1.0) / n.sqrt())
            }
        };
        Some(FittedAlpha { alpha, sig_alpha })
    }
}

fn median(mut values: Vec<Real>) -> Real {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// Fits every template in the bank against its surviving triggers. Templates
/// with no triggers are recorded with [NO_FIT_SENTINEL] and count zero, and
/// the loop carries on.
pub(crate) fn fit_each_template(
    triggers: &RankedTriggers,
    bank_size: usize,
    fit_function: FitFunction,
    threshold: Real,
) -> Result<TemplateFits, FitError> {
    let mut by_template: Vec<Vec<usize>> = vec![Vec::new(); bank_size];
    for (index, &template_id) in triggers.triggers.template_id.iter().enumerate() {
        by_template
            .get_mut(template_id as usize)
            .ok_or(FitError::UnknownTemplate {
                template_id,
                bank_size,
            })?
            .push(index);
    }

    let mut count_above_thresh = Vec::with_capacity(bank_size);
    let mut fit_coeff = Vec::with_capacity(bank_size);
    let mut median_aux: Option<Vec<Real>> = triggers
        .triggers
        .aux
        .as_ref()
        .map(|_| Vec::with_capacity(bank_size));

    for (template, indices) in by_template.iter().enumerate() {
        let values: Vec<Real> = indices.iter().map(|&index| triggers.stat[index]).collect();
        count_above_thresh.push(values.len() as u64);
        match fit_function.fit_above_thresh(&values, threshold) {
            Some(fitted) => {
                debug!(
                    "template {template}: {} triggers, alpha {} +/- {}",
                    values.len(),
                    fitted.alpha,
                    fitted.sig_alpha
                );
                fit_coeff.push(fitted.alpha);
            }
            None => fit_coeff.push(NO_FIT_SENTINEL),
        }
        if let (Some(medians), Some(aux)) = (median_aux.as_mut(), triggers.triggers.aux.as_ref()) {
            let samples: Vec<Real> = indices.iter().map(|&index| aux[index]).collect();
            medians.push(if samples.is_empty() {
                NO_FIT_SENTINEL
            } else {
                median(samples)
            });
        }
    }

    Ok(TemplateFits {
        template_id: Array1::from_iter(0..bank_size as u64),
        count_above_thresh: Array1::from_vec(count_above_thresh),
        fit_coeff: Array1::from_vec(fit_coeff),
        median_aux: median_aux.map(Array1::from_vec),
    })
}
