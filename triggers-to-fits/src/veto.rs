//! Removal of triggers whose times fall in named veto intervals.
use crate::error::FitError;
use crate::hdf5_io::{ConvertResult, GroupExt, open_file};
use ndarray::Array1;
use std::path::Path;
use tracing::debug;
use trigfit_common::{ColumnLengthMismatch, GpsTime};

/// A coalesced, time-ordered list of `[start, end)` intervals.
#[derive(Debug, Clone)]
pub(crate) struct SegmentList {
    segments: Vec<(GpsTime, GpsTime)>,
}

impl SegmentList {
    pub(crate) fn new(mut segments: Vec<(GpsTime, GpsTime)>) -> Self {
        segments.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut coalesced: Vec<(GpsTime, GpsTime)> = Vec::with_capacity(segments.len());
        for (start, end) in segments {
            match coalesced.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => coalesced.push((start, end)),
            }
        }
        Self {
            segments: coalesced,
        }
    }

    /// Loads the `segments/<name>/{start,end}` datasets of a veto file.
    pub(crate) fn from_file(path: &Path, name: &str) -> Result<Self, FitError> {
        let file = open_file(path)?;
        let group = file.group(&format!("segments/{name}")).err_group(&file)?;
        let start = group.get_array::<GpsTime>("start")?;
        let end = group.get_array::<GpsTime>("end")?;
        if start.len() != end.len() {
            return Err(ColumnLengthMismatch {
                lengths: vec![start.len(), end.len()],
            }
            .into());
        }
        debug!("loaded {} '{name}' segments from {}", start.len(), path.display());
        Ok(Self::new(start.iter().copied().zip(end.iter().copied()).collect()))
    }

    pub(crate) fn contains(&self, time: GpsTime) -> bool {
        let next = self.segments.partition_point(|&(start, _)| start <= time);
        next > 0
            && self
                .segments
                .get(next - 1)
                .is_some_and(|&(_, end)| time < end)
    }

    /// Splits trigger indices into (retained, vetoed).
    pub(crate) fn partition(&self, times: &Array1<GpsTime>) -> (Vec<usize>, Vec<usize>) {
        let mut kept = Vec::new();
        let mut vetoed = Vec::new();
        for (index, &time) in times.iter().enumerate() {
            if self.contains(time) {
                vetoed.push(index);
            } else {
                kept.push(index);
            }
        }
        (kept, vetoed)
    }
}
