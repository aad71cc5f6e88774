//! Iterative removal of the loudest trigger events, distributed fairly over
//! bins of a template parameter, so that rare loud outliers do not bias the
//! per-template fits.
//!
//! The loop keeps two owned buffers: the *working* triggers, which become the
//! fit input, and a *probe* copy used only to search for the next loudest
//! candidate. When a candidate's bin still has quota, the window around it is
//! removed from both buffers and its time is recorded against the bin; when
//! the bin is already full, the window is removed from the probe buffer only,
//! so the working triggers keep events whose bin quota was spent elsewhere.
use crate::binning::ParameterBins;
use crate::statistic::RankedTriggers;
use ndarray::{Array1, Axis};
use ndarray_stats::{QuantileExt, errors::MinMaxError};
use thiserror::Error;
use tracing::{debug, info};
use trigfit_common::{GpsTime, Real, TemplateId};

pub(crate) const MAX_PRUNE_ITERATIONS: usize = 1000;

#[derive(Debug, Error)]
pub(crate) enum PruneError {
    #[error("pruned-time bookkeeping exceeded capacity: {total} > {capacity}")]
    QuotaOverflow { total: usize, capacity: usize },
    #[error("candidate pool exhausted with {total} of {capacity} prune slots filled")]
    CandidatesExhausted { total: usize, capacity: usize },
    #[error("loudest-event search failed: {0}")]
    LoudestUndefined(#[from] MinMaxError),
    #[error("trigger references template {template_id} outside the bank of {bank_size} templates")]
    UnknownTemplate { template_id: TemplateId, bank_size: usize },
    #[error("prune loop still incomplete after {0} iterations")]
    IterationBudgetExhausted(usize),
}

pub(crate) struct PruneConfig<'a> {
    pub(crate) bins: &'a ParameterBins,
    /// Derived bin parameter per template, indexed by template id.
    pub(crate) template_param: &'a Array1<Real>,
    /// Half-width of the removal window around a loudest event, in seconds.
    pub(crate) window: Real,
    /// Events to prune per bin.
    pub(crate) quota: usize,
}

/// Bounded queue of pruned-event times for one parameter bin.
#[derive(Debug, Clone)]
struct PrunedBin {
    quota: usize,
    times: Vec<GpsTime>,
}

impl PrunedBin {
    fn new(quota: usize) -> Self {
        Self {
            quota,
            times: Vec::with_capacity(quota),
        }
    }

    fn is_full(&self) -> bool {
        self.times.len() >= self.quota
    }

    fn try_append(&mut self, time: GpsTime) -> bool {
        if self.is_full() {
            false
        } else {
            self.times.push(time);
            true
        }
    }
}

/// The probe copy of the columns the loudest-event search runs over.
#[derive(Debug, Clone)]
struct ProbeColumns {
    stat: Array1<Real>,
    template_id: Array1<TemplateId>,
    time: Array1<GpsTime>,
}

impl ProbeColumns {
    fn select(&self, keep: &[usize]) -> Self {
        Self {
            stat: self.stat.select(Axis(0), keep),
            template_id: self.template_id.select(Axis(0), keep),
            time: self.time.select(Axis(0), keep),
        }
    }
}

impl From<&RankedTriggers> for ProbeColumns {
    fn from(working: &RankedTriggers) -> Self {
        Self {
            stat: working.stat.clone(),
            template_id: working.triggers.template_id.clone(),
            time: working.triggers.end_time.clone(),
        }
    }
}

/// Indices of the events further than `window` from `centre`, shared by the
/// working and probe removal paths.
fn window_survivors(times: &Array1<GpsTime>, centre: GpsTime, window: Real) -> Vec<usize> {
    times
        .iter()
        .enumerate()
        .filter(|&(_, &time)| (time - centre).abs() >= window)
        .map(|(index, _)| index)
        .collect()
}

pub(crate) enum Progress {
    Continue,
    Done,
}

/// The full mutable state of one prune run, owned by the loop for its
/// duration and consumed on termination.
pub(crate) struct PruneState {
    working: RankedTriggers,
    probe: ProbeColumns,
    bins: Vec<PrunedBin>,
}

impl PruneState {
    pub(crate) fn new(working: RankedTriggers, bin_count: usize, quota: usize) -> Self {
        Self {
            probe: ProbeColumns::from(&working),
            working,
            bins: vec![PrunedBin::new(quota); bin_count],
        }
    }

    fn total_pruned(&self) -> usize {
        self.bins.iter().map(|bin| bin.times.len()).sum()
    }

    fn capacity(&self) -> usize {
        self.bins.iter().map(|bin| bin.quota).sum()
    }

    /// One transition of the prune loop.
    pub(crate) fn step(mut self, config: &PruneConfig) -> Result<(Self, Progress), PruneError> {
        let total = self.total_pruned();
        let capacity = self.capacity();
        if total == capacity {
            return Ok((self, Progress::Done));
        }
        if total > capacity {
            return Err(PruneError::QuotaOverflow { total, capacity });
        }
        if self.probe.stat.is_empty() {
            return Err(PruneError::CandidatesExhausted { total, capacity });
        }

        let loudest = self.probe.stat.argmax()?;
        let stat = self.probe.stat[loudest];
        let template_id = self.probe.template_id[loudest];
        let time = self.probe.time[loudest];

        let param = *config
            .template_param
            .get(template_id as usize)
            .ok_or(PruneError::UnknownTemplate {
                template_id,
                bank_size: config.template_param.len(),
            })?;
        let bin = config.bins.index_of(param);

        if self
            .bins
            .get(bin)
            .is_none_or(|pruned_bin| pruned_bin.is_full())
        {
            // Bin quota already spent: the loudest event stays in the working
            // triggers but is taken out of the candidate search, along with
            // its window.
            debug!("bin {bin} full, skipping event at {time} (stat {stat})");
            self.probe = self
                .probe
                .select(&window_survivors(&self.probe.time, time, config.window));
        } else {
            debug!("pruning events within {}s of {time} (stat {stat}, bin {bin})", config.window);
            self.working = self
                .working
                .select(&window_survivors(self.working.times(), time, config.window));
            self.probe = self
                .probe
                .select(&window_survivors(&self.probe.time, time, config.window));
            if let Some(pruned_bin) = self.bins.get_mut(bin) {
                if !pruned_bin.try_append(time) {
                    return Err(PruneError::QuotaOverflow {
                        total: total + 1,
                        capacity,
                    });
                }
            }
        }
        Ok((self, Progress::Continue))
    }

    /// The pruned working triggers; the probe copy and the bin bookkeeping
    /// are dropped here, ahead of the fit phase.
    pub(crate) fn into_working(self) -> RankedTriggers {
        self.working
    }
}

/// Runs the prune loop to completion, up to the iteration budget.
pub(crate) fn prune_loudest_events(
    triggers: RankedTriggers,
    config: &PruneConfig,
) -> Result<RankedTriggers, PruneError> {
    let before = triggers.len();
    let mut state = PruneState::new(triggers, config.bins.count(), config.quota);
    for iteration in 0..MAX_PRUNE_ITERATIONS {
        let (next, progress) = state.step(config)?;
        state = next;
        if matches!(progress, Progress::Done) {
            let pruned = state.into_working();
            info!(
                "pruned {} of {before} triggers in {iteration} iterations",
                before - pruned.len()
            );
            return Ok(pruned);
        }
    }
    Err(PruneError::IterationBudgetExhausted(MAX_PRUNE_ITERATIONS))
}
