use crate::error::FitError;
use crate::hdf5_io::{GroupExt, open_file};
use ndarray::Array1;
use std::path::Path;
use tracing::info;
use trigfit_common::{ColumnLengthMismatch, Real};

/// The template bank: parallel mass and aligned-spin columns, with
/// `template_hash` defining the template count.
#[derive(Debug, Clone)]
pub(crate) struct TemplateBank {
    pub(crate) mass1: Array1<Real>,
    pub(crate) mass2: Array1<Real>,
    pub(crate) spin1z: Array1<Real>,
    pub(crate) spin2z: Array1<Real>,
    pub(crate) template_hash: Array1<u64>,
}

impl TemplateBank {
    pub(crate) fn num_templates(&self) -> usize {
        self.template_hash.len()
    }

    fn check_consistent(&self) -> Result<(), ColumnLengthMismatch> {
        let lengths = vec![
            self.mass1.len(),
            self.mass2.len(),
            self.spin1z.len(),
            self.spin2z.len(),
            self.template_hash.len(),
        ];
        if lengths.iter().all(|&len| len == self.num_templates()) {
            Ok(())
        } else {
            Err(ColumnLengthMismatch { lengths })
        }
    }
}

pub(crate) fn load_bank(path: &Path) -> Result<TemplateBank, FitError> {
    let file = open_file(path)?;
    let bank = TemplateBank {
        mass1: file.get_array("mass1")?,
        mass2: file.get_array("mass2")?,
        spin1z: file.get_array("spin1z")?,
        spin2z: file.get_array("spin2z")?,
        template_hash: file.get_array("template_hash")?,
    };
    bank.check_consistent()?;
    info!(
        "loaded a bank of {} templates from {}",
        bank.num_templates(),
        path.display()
    );
    Ok(bank)
}
