use crate::fitting::FitFunction;
use crate::hdf5_io::{ConvertResult, FitFileResult, GroupExt, create_file};
use crate::statistic::RankingStatistic;
use ndarray::Array1;
use std::path::Path;
use tracing::info;
use trigfit_common::{Real, TemplateId};

/// Per-template fit output for a contiguous range of template indices.
#[derive(Debug, Clone)]
pub(crate) struct TemplateFits {
    pub(crate) template_id: Array1<TemplateId>,
    pub(crate) count_above_thresh: Array1<u64>,
    pub(crate) fit_coeff: Array1<Real>,
    pub(crate) median_aux: Option<Array1<Real>>,
}

/// Provenance recorded alongside the fit datasets.
#[derive(Debug, Clone)]
pub(crate) struct FitMetadata<'a> {
    pub(crate) ifo: &'a str,
    pub(crate) fit_function: FitFunction,
    pub(crate) statistic: RankingStatistic,
    pub(crate) stat_factor: Option<Real>,
    pub(crate) aux_param: Option<&'a str>,
    pub(crate) stat_threshold: Real,
}

pub(crate) fn write_results(
    path: &Path,
    fits: &TemplateFits,
    metadata: &FitMetadata,
) -> FitFileResult<()> {
    let file = create_file(path)?;
    let group = file.create_group(metadata.ifo).err_group(&file)?;

    group.set_array("template_id", &fits.template_id)?;
    group.set_array("count_above_thresh", &fits.count_above_thresh)?;
    group.set_array("fit_coeff", &fits.fit_coeff)?;
    if let Some(median_aux) = &fits.median_aux {
        group.set_array("median_param", median_aux)?;
    }

    group.set_string_attribute("ifo", metadata.ifo)?;
    group.set_string_attribute("fit_function", &metadata.fit_function.to_string())?;
    group.set_string_attribute("sngl_ranking", &metadata.statistic.to_string())?;
    group.set_scalar_attribute("stat_threshold", &metadata.stat_threshold)?;
    if let Some(factor) = metadata.stat_factor {
        group.set_scalar_attribute("stat_factor", &factor)?;
    }
    if let Some(aux_param) = metadata.aux_param {
        group.set_string_attribute("aux_param", aux_param)?;
    }

    info!(
        "wrote {} template fits to {}",
        fits.template_id.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf5::types::VarLenUnicode;
    use ndarray::array;
    use std::fs;

    fn scratch_file(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("triggers-to-fits-{tag}-{}.hdf", std::process::id()))
    }

    #[test]
    fn results_round_trip() {
        let path = scratch_file("round-trip");
        let fits = TemplateFits {
            template_id: array![0, 1, 2],
            count_above_thresh: array![12, 0, 3],
            fit_coeff: array![3.5, -100.0, 0.25],
            median_aux: Some(array![1.25, -100.0, 2.5]),
        };
        let metadata = FitMetadata {
            ifo: "L1",
            fit_function: FitFunction::Rayleigh,
            statistic: RankingStatistic::NewSnr,
            stat_factor: Some(6.0),
            aux_param: Some("sigma"),
            stat_threshold: 6.5,
        };
        write_results(&path, &fits, &metadata).unwrap();

        let file = hdf5::File::open(&path).unwrap();
        let group = file.group("L1").unwrap();
        assert_eq!(
            group.dataset("template_id").unwrap().read_1d::<TemplateId>().unwrap(),
            fits.template_id
        );
        assert_eq!(
            group.dataset("count_above_thresh").unwrap().read_1d::<u64>().unwrap(),
            fits.count_above_thresh
        );
        // Coefficients must survive bit-for-bit.
        assert_eq!(
            group.dataset("fit_coeff").unwrap().read_1d::<Real>().unwrap(),
            fits.fit_coeff
        );
        assert_eq!(
            group.dataset("median_param").unwrap().read_1d::<Real>().unwrap(),
            fits.median_aux.clone().unwrap()
        );
        let fit_function: VarLenUnicode =
            group.attr("fit_function").unwrap().read_scalar().unwrap();
        assert_eq!(fit_function.as_str(), "rayleigh");
        let threshold: Real = group.attr("stat_threshold").unwrap().read_scalar().unwrap();
        assert_eq!(threshold, 6.5);
        let factor: Real = group.attr("stat_factor").unwrap().read_scalar().unwrap();
        assert_eq!(factor, 6.0);

        drop(file);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn optional_fields_can_be_absent() {
        let path = scratch_file("no-options");
        let fits = TemplateFits {
            template_id: array![0],
            count_above_thresh: array![0],
            fit_coeff: array![-100.0],
            median_aux: None,
        };
        let metadata = FitMetadata {
            ifo: "H1",
            fit_function: FitFunction::Exponential,
            statistic: RankingStatistic::Snr,
            stat_factor: None,
            aux_param: None,
            stat_threshold: 5.5,
        };
        write_results(&path, &fits, &metadata).unwrap();

        let file = hdf5::File::open(&path).unwrap();
        let group = file.group("H1").unwrap();
        assert!(!group.link_exists("median_param"));
        assert!(group.attr("stat_factor").is_err());

        drop(file);
        fs::remove_file(&path).ok();
    }
}
