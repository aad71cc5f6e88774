use crate::binning::BinningError;
use crate::hdf5_io::FitFileError;
use crate::pruning::PruneError;
use crate::statistic::StatisticError;
use thiserror::Error;
use trigfit_common::{ColumnLengthMismatch, TemplateId};

/// Errors that abort the whole run. No partial output is written for any of
/// them.
#[derive(Debug, Error)]
pub(crate) enum FitError {
    #[error("{0}")]
    Usage(#[from] UsageError),
    #[error("{0}")]
    File(#[from] FitFileError),
    #[error("{0}")]
    Statistic(#[from] StatisticError),
    #[error("{0}")]
    Binning(#[from] BinningError),
    #[error("{0}")]
    Prune(#[from] PruneError),
    #[error("{0}")]
    Columns(#[from] ColumnLengthMismatch),
    #[error("auxiliary parameter '{param}' not present in the {ifo} trigger group")]
    MissingAuxColumn { param: String, ifo: String },
    #[error("trigger references template {template_id} outside the bank of {bank_size} templates")]
    UnknownTemplate {
        template_id: TemplateId,
        bank_size: usize,
    },
}

/// Command-line misuse, reported before any computation starts.
#[derive(Debug, Error)]
pub(crate) enum UsageError {
    #[error("expected one veto segment name per veto file, got {files} files and {names} names")]
    VetoListMismatch { files: usize, names: usize },
    #[error(
        "pruning requires --prune-param, --prune-bins and --prune-number to be given together"
    )]
    PartialPruneOptions,
}
