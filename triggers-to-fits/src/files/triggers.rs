use crate::error::FitError;
use crate::hdf5_io::{ConvertResult, GroupExt, open_file};
use std::path::Path;
use tracing::info;
use trigfit_common::TriggerColumns;

/// Loads the parallel per-trigger datasets of one interferometer group.
pub(crate) fn load_triggers(
    path: &Path,
    ifo: &str,
    aux_param: Option<&str>,
) -> Result<TriggerColumns, FitError> {
    let file = open_file(path)?;
    let group = file.group(ifo).err_group(&file)?;

    let aux = match aux_param {
        Some(name) => {
            if !group.link_exists(name) {
                return Err(FitError::MissingAuxColumn {
                    param: name.to_owned(),
                    ifo: ifo.to_owned(),
                });
            }
            Some(group.get_array(name)?)
        }
        None => None,
    };

    let columns = TriggerColumns {
        snr: group.get_array("snr")?,
        chisq: group.get_array("chisq")?,
        chisq_dof: group.get_array("chisq_dof")?,
        sg_chisq: group.get_optional_array("sg_chisq")?,
        template_id: group.get_array("template_id")?,
        end_time: group.get_array("end_time")?,
        aux,
    };
    columns.check_consistent()?;
    info!(
        "loaded {} {ifo} triggers from {}",
        columns.len(),
        path.display()
    );
    Ok(columns)
}
