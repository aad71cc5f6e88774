mod binning;
mod error;
mod files;
mod fitting;
mod hdf5_io;
mod pruning;
mod statistic;
mod veto;

use binning::{BinParameter, ParameterBins};
use clap::Parser;
use error::{FitError, UsageError};
use fitting::FitFunction;
use pruning::PruneConfig;
use statistic::{RankedTriggers, RankingStatistic};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};
use trigfit_common::Real;
use veto::SegmentList;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// HDF5 file of single-detector triggers, one group per interferometer.
    #[clap(long)]
    trigger_file: PathBuf,

    /// HDF5 template bank the triggers were matched against.
    #[clap(long)]
    bank_file: PathBuf,

    /// Output HDF5 file of per-template fit coefficients.
    #[clap(long)]
    output: PathBuf,

    /// Interferometer whose triggers are fitted.
    #[clap(long)]
    ifo: String,

    /// Only triggers with ranking statistic at or above this value are
    /// fitted.
    #[clap(long)]
    stat_threshold: Real,

    #[clap(long, default_value = "new_snr")]
    sngl_ranking: RankingStatistic,

    /// Scale factor for rankings that accept one.
    #[clap(long)]
    stat_factor: Option<Real>,

    #[clap(long, default_value = "exponential")]
    fit_function: FitFunction,

    /// Veto files, each paired positionally with a --veto-segment-name.
    #[clap(long)]
    veto_file: Vec<PathBuf>,

    #[clap(long)]
    veto_segment_name: Vec<String>,

    /// Name of an auxiliary trigger dataset whose per-template median is
    /// recorded alongside the fits.
    #[clap(long)]
    aux_param: Option<String>,

    /// Template parameter to bin the prune quota over. Pruning is enabled by
    /// giving --prune-param, --prune-bins and --prune-number together.
    #[clap(long)]
    prune_param: Option<BinParameter>,

    #[clap(long)]
    prune_bins: Option<usize>,

    /// Loudest events to prune per bin.
    #[clap(long)]
    prune_number: Option<usize>,

    /// Half-width in seconds of the removal window around a pruned event.
    #[clap(long, default_value = "0.1")]
    prune_window: Real,

    /// Space the prune bins logarithmically over the parameter range.
    #[clap(long)]
    log_prune_param: bool,
}

struct PruneSettings {
    param: BinParameter,
    bins: usize,
    number: usize,
}

fn prune_settings(args: &Cli) -> Result<Option<PruneSettings>, UsageError> {
    match (args.prune_param, args.prune_bins, args.prune_number) {
        (Some(param), Some(bins), Some(number)) => Ok(Some(PruneSettings {
            param,
            bins,
            number,
        })),
        (None, None, None) => Ok(None),
        _ => Err(UsageError::PartialPruneOptions),
    }
}

fn run(args: &Cli) -> Result<(), FitError> {
    // Usage checks come first, before any file is opened.
    args.sngl_ranking.check_factor(args.stat_factor)?;
    if args.veto_file.len() != args.veto_segment_name.len() {
        return Err(UsageError::VetoListMismatch {
            files: args.veto_file.len(),
            names: args.veto_segment_name.len(),
        }
        .into());
    }
    let prune = prune_settings(args)?;

    let bank = files::bank::load_bank(&args.bank_file)?;
    let triggers =
        files::triggers::load_triggers(&args.trigger_file, &args.ifo, args.aux_param.as_deref())?;

    let ranked = RankedTriggers::rank(triggers, args.sngl_ranking, args.stat_factor)?;
    let mut ranked = ranked.above_threshold(args.stat_threshold);
    info!(
        "{} triggers at or above {} {}",
        ranked.len(),
        args.sngl_ranking,
        args.stat_threshold
    );

    for (veto_file, segment_name) in args.veto_file.iter().zip(&args.veto_segment_name) {
        let segments = SegmentList::from_file(veto_file, segment_name)?;
        let (kept, vetoed) = segments.partition(ranked.times());
        info!("veto '{segment_name}' removed {} triggers", vetoed.len());
        ranked = ranked.select(&kept);
    }

    if let Some(prune) = prune {
        let template_param = prune.param.derive(&bank);
        let bins = ParameterBins::over(&template_param, prune.bins, args.log_prune_param)?;
        let config = PruneConfig {
            bins: &bins,
            template_param: &template_param,
            window: args.prune_window,
            quota: prune.number,
        };
        ranked = pruning::prune_loudest_events(ranked, &config)?;
        info!("{} triggers survive pruning", ranked.len());
    }

    let fits = fitting::fit_each_template(
        &ranked,
        bank.num_templates(),
        args.fit_function,
        args.stat_threshold,
    )?;

    let metadata = files::results::FitMetadata {
        ifo: &args.ifo,
        fit_function: args.fit_function,
        statistic: args.sngl_ranking,
        stat_factor: args.stat_factor,
        aux_param: args.aux_param.as_deref(),
        stat_threshold: args.stat_threshold,
    };
    files::results::write_results(&args.output, &fits, &metadata)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Cli::parse();
    debug!("args: {args:?}");
    run(&args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(extra: &[&str]) -> Cli {
        let mut argv = vec![
            "triggers-to-fits",
            "--trigger-file",
            "triggers.hdf",
            "--bank-file",
            "bank.hdf",
            "--output",
            "fits.hdf",
            "--ifo",
            "H1",
            "--stat-threshold",
            "6.0",
        ];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv)
    }

    #[test]
    fn defaults_are_newsnr_and_exponential() {
        let args = cli(&[]);
        assert_eq!(args.sngl_ranking, RankingStatistic::NewSnr);
        assert_eq!(args.fit_function, FitFunction::Exponential);
        assert_eq!(args.prune_window, 0.1);
    }

    #[test]
    fn complete_prune_triple_accepted() {
        let args = cli(&["--prune-param", "mchirp", "--prune-bins", "2", "--prune-number", "1"]);
        let settings = prune_settings(&args).unwrap().unwrap();
        assert_eq!(settings.param, BinParameter::Mchirp);
        assert_eq!(settings.bins, 2);
        assert_eq!(settings.number, 1);
    }

    #[test]
    fn absent_prune_triple_accepted() {
        assert!(prune_settings(&cli(&[])).unwrap().is_none());
    }

    #[test]
    fn partial_prune_triple_rejected() {
        let args = cli(&["--prune-bins", "2"]);
        assert!(matches!(
            prune_settings(&args),
            Err(UsageError::PartialPruneOptions)
        ));
    }

    #[test]
    fn mismatched_veto_lists_rejected() {
        let args = cli(&["--veto-file", "vetoes.hdf"]);
        assert!(matches!(
            run(&args),
            Err(FitError::Usage(UsageError::VetoListMismatch {
                files: 1,
                names: 0
            }))
        ));
    }

    #[test]
    fn factor_with_plain_snr_rejected_before_io() {
        let args = cli(&["--sngl-ranking", "snr", "--stat-factor", "6.0"]);
        assert!(matches!(run(&args), Err(FitError::Statistic(_))));
    }
}
