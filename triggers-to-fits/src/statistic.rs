//! Ranks triggers with a named single-detector statistic and applies the
//! statistic threshold.
use ndarray::{Array1, Zip};
use thiserror::Error;
use trigfit_common::{GpsTime, Real, TriggerColumns};

const NEWSNR_INDEX: Real = 6.0;
const EFFSNR_FACTOR: Real = 250.0;

#[derive(Debug, Error)]
pub(crate) enum StatisticError {
    #[error("ranking statistic '{0}' does not accept a scale factor")]
    UnexpectedFactor(RankingStatistic),
    #[error("ranking statistic '{0}' requires the sg_chisq column, which the trigger file does not provide")]
    MissingSgChisq(RankingStatistic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum RankingStatistic {
    Snr,
    Snronchi,
    NewSnr,
    EffectiveSnr,
    NewsnrSgveto,
}

impl RankingStatistic {
    pub(crate) fn accepts_factor(self) -> bool {
        matches!(self, Self::NewSnr | Self::EffectiveSnr)
    }

    /// Usage check, run before any file is opened.
    pub(crate) fn check_factor(self, factor: Option<Real>) -> Result<(), StatisticError> {
        if factor.is_some() && !self.accepts_factor() {
            Err(StatisticError::UnexpectedFactor(self))
        } else {
            Ok(())
        }
    }

    fn compute(
        self,
        triggers: &TriggerColumns,
        factor: Option<Real>,
    ) -> Result<Array1<Real>, StatisticError> {
        self.check_factor(factor)?;
        let rchisq = reduced_chisq(triggers);
        match self {
            Self::Snr => Ok(triggers.snr.clone()),
            Self::Snronchi => Ok(Zip::from(&triggers.snr)
                .and(&rchisq)
                .map_collect(|&snr, &rchisq| snr / rchisq.sqrt())),
            Self::NewSnr => Ok(newsnr(
                &triggers.snr,
                &rchisq,
                factor.unwrap_or(NEWSNR_INDEX),
            )),
            Self::EffectiveSnr => Ok(effsnr(
                &triggers.snr,
                &rchisq,
                factor.unwrap_or(EFFSNR_FACTOR),
            )),
            Self::NewsnrSgveto => {
                let sg_chisq = triggers
                    .sg_chisq
                    .as_ref()
                    .ok_or(StatisticError::MissingSgChisq(self))?;
                let nsnr = newsnr(&triggers.snr, &rchisq, NEWSNR_INDEX);
                Ok(Zip::from(&nsnr)
                    .and(sg_chisq)
                    .map_collect(|&nsnr, &sg_chisq| {
                        if sg_chisq > 4.0 {
                            nsnr * (4.0 / sg_chisq).sqrt()
                        } else {
                            nsnr
                        }
                    }))
            }
        }
    }
}

/// Reduced chi-square of a single-detector trigger, `chisq / (2 p - 2)` for
/// `p` chi-square bins.
fn reduced_chisq(triggers: &TriggerColumns) -> Array1<Real> {
    Zip::from(&triggers.chisq)
        .and(&triggers.chisq_dof)
        .map_collect(|&chisq, &dof| chisq / (2.0 * dof - 2.0))
}

/// Re-weighted SNR with chi-square index `q`; identity when the reduced
/// chi-square does not exceed one.
fn newsnr(snr: &Array1<Real>, rchisq: &Array1<Real>, q: Real) -> Array1<Real> {
    Zip::from(snr).and(rchisq).map_collect(|&snr, &rchisq| {
        if rchisq > 1.0 {
            snr / ((1.0 + rchisq.powf(q / 2.0)) / 2.0).powf(1.0 / q)
        } else {
            snr
        }
    })
}

fn effsnr(snr: &Array1<Real>, rchisq: &Array1<Real>, fac: Real) -> Array1<Real> {
    Zip::from(snr).and(rchisq).map_collect(|&snr, &rchisq| {
        snr / (1.0 + snr * snr / fac).powf(0.25) / rchisq.powf(0.25)
    })
}

/// Trigger columns paired with their computed ranking statistic, kept in
/// lock-step through every subsequent filter.
#[derive(Debug, Clone)]
pub(crate) struct RankedTriggers {
    pub(crate) stat: Array1<Real>,
    pub(crate) triggers: TriggerColumns,
}

impl RankedTriggers {
    pub(crate) fn rank(
        triggers: TriggerColumns,
        statistic: RankingStatistic,
        factor: Option<Real>,
    ) -> Result<Self, StatisticError> {
        let stat = statistic.compute(&triggers, factor)?;
        Ok(Self { stat, triggers })
    }

    pub(crate) fn len(&self) -> usize {
        self.stat.len()
    }

    pub(crate) fn times(&self) -> &Array1<GpsTime> {
        &self.triggers.end_time
    }

    pub(crate) fn select(&self, keep: &[usize]) -> Self {
        Self {
            stat: self.stat.select(ndarray::Axis(0), keep),
            triggers: self.triggers.select(keep),
        }
    }

    /// Retains the triggers whose statistic meets the threshold.
    pub(crate) fn above_threshold(&self, threshold: Real) -> Self {
        let keep: Vec<usize> = self
            .stat
            .iter()
            .enumerate()
            .filter(|&(_, &stat)| stat >= threshold)
            .map(|(index, _)| index)
            .collect();
        self.select(&keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;
    use rand::Rng;

    fn triggers(snr: Array1<Real>, chisq: Array1<Real>, dof: Real) -> TriggerColumns {
        let n = snr.len();
        TriggerColumns {
            chisq_dof: Array1::from_elem(n, dof),
            template_id: Array1::zeros(n),
            end_time: Array1::zeros(n),
            snr,
            chisq,
            ..Default::default()
        }
    }

    #[test]
    fn snr_is_identity() {
        let triggers = triggers(array![5.0, 9.5], array![30.0, 10.0], 16.0);
        let stat = RankingStatistic::Snr.compute(&triggers, None).unwrap();
        assert_eq!(stat, array![5.0, 9.5]);
    }

    #[test]
    fn snronchi_divides_by_root_rchisq() {
        // 16 dof bins give 2 * 16 - 2 = 30 degrees of freedom.
        let triggers = triggers(array![6.0], array![120.0], 16.0);
        let stat = RankingStatistic::Snronchi.compute(&triggers, None).unwrap();
        assert_approx_eq!(stat[0], 3.0, 1e-12);
    }

    #[test]
    fn newsnr_is_identity_below_unit_rchisq() {
        let triggers = triggers(array![8.0], array![15.0], 16.0);
        let stat = RankingStatistic::NewSnr.compute(&triggers, None).unwrap();
        assert_approx_eq!(stat[0], 8.0, 1e-12);
    }

    #[test]
    fn newsnr_downweights_high_rchisq() {
        let triggers = triggers(array![8.0], array![120.0], 16.0);
        let stat = RankingStatistic::NewSnr.compute(&triggers, None).unwrap();
        let expected = 8.0 / ((1.0 + 4.0_f64.powf(3.0)) / 2.0).powf(1.0 / 6.0);
        assert_approx_eq!(stat[0], expected, 1e-12);
    }

    #[test]
    fn effective_snr_with_factor() {
        let triggers = triggers(array![10.0], array![60.0], 16.0);
        let stat = RankingStatistic::EffectiveSnr
            .compute(&triggers, Some(100.0))
            .unwrap();
        let expected = 10.0 / 2.0_f64.powf(0.25) / 2.0_f64.powf(0.25);
        assert_approx_eq!(stat[0], expected, 1e-12);
    }

    #[test]
    fn sgveto_scales_above_four() {
        let mut triggers = triggers(array![8.0, 8.0], array![15.0, 15.0], 16.0);
        triggers.sg_chisq = Some(array![1.0, 16.0]);
        let stat = RankingStatistic::NewsnrSgveto
            .compute(&triggers, None)
            .unwrap();
        assert_approx_eq!(stat[0], 8.0, 1e-12);
        assert_approx_eq!(stat[1], 4.0, 1e-12);
    }

    #[test]
    fn sgveto_requires_secondary_chisq() {
        let triggers = triggers(array![8.0], array![15.0], 16.0);
        assert!(matches!(
            RankingStatistic::NewsnrSgveto.compute(&triggers, None),
            Err(StatisticError::MissingSgChisq(_))
        ));
    }

    #[test]
    fn factor_rejected_for_plain_snr() {
        assert!(matches!(
            RankingStatistic::Snr.check_factor(Some(6.0)),
            Err(StatisticError::UnexpectedFactor(_))
        ));
        assert!(RankingStatistic::NewSnr.check_factor(Some(6.0)).is_ok());
    }

    #[test]
    fn statistic_names_parse() {
        assert_eq!(
            "newsnr_sgveto".parse::<RankingStatistic>().unwrap(),
            RankingStatistic::NewsnrSgveto
        );
        assert_eq!(RankingStatistic::NewSnr.to_string(), "new_snr");
        assert!("no_such_stat".parse::<RankingStatistic>().is_err());
    }

    #[test]
    fn threshold_retains_expected_count_in_lock_step() {
        let mut rng = rand::rng();
        let n = 200;
        let snr = Array1::from_iter((0..n).map(|_| rng.random_range(4.0..12.0)));
        let expected = snr.iter().filter(|&&snr| snr >= 8.0).count();
        let ranked = RankedTriggers::rank(
            triggers(snr, Array1::from_elem(n, 15.0), 16.0),
            RankingStatistic::Snr,
            None,
        )
        .unwrap();
        let above = ranked.above_threshold(8.0);
        assert_eq!(above.len(), expected);
        assert!(above.stat.iter().all(|&stat| stat >= 8.0));
        assert!(above.triggers.check_consistent().is_ok());
        assert_eq!(above.triggers.len(), expected);
    }
}
