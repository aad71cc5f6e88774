//! Thin extension traits over the hdf5 [Group] and [Dataset] types, so that
//! every I/O error carries the path of the object it occurred at.
use hdf5::{Dataset, File, Group, H5Type, types::VarLenUnicode};
use ndarray::Array1;
use std::path::Path;
use thiserror::Error;

pub(crate) type FitFileResult<T> = Result<T, FitFileError>;

const NO_PATH_SET: &str = "[no path set]";

#[derive(Debug, Error)]
pub(crate) enum FitFileError {
    #[error("HDF5 error: {error} at {}", path.as_deref().unwrap_or(NO_PATH_SET))]
    Hdf5 {
        #[source]
        error: hdf5::Error,
        path: Option<String>,
    },
    #[error("HDF5 string error: {error} at {}", path.as_deref().unwrap_or(NO_PATH_SET))]
    Hdf5String {
        #[source]
        error: hdf5::types::StringError,
        path: Option<String>,
    },
}

impl From<hdf5::Error> for FitFileError {
    fn from(error: hdf5::Error) -> Self {
        Self::Hdf5 { error, path: None }
    }
}

impl From<hdf5::types::StringError> for FitFileError {
    fn from(error: hdf5::types::StringError) -> Self {
        Self::Hdf5String { error, path: None }
    }
}

impl FitFileError {
    fn with_path(self, new_path: String) -> Self {
        match self {
            Self::Hdf5 { error, path: None } => Self::Hdf5 {
                error,
                path: Some(new_path),
            },
            Self::Hdf5String { error, path: None } => Self::Hdf5String {
                error,
                path: Some(new_path),
            },
            other => other,
        }
    }
}

pub(crate) trait ConvertResult<T>: Sized {
    fn err_group(self, group: &Group) -> FitFileResult<T>;
    fn err_dataset(self, dataset: &Dataset) -> FitFileResult<T>;
}

impl<T, E: Into<FitFileError>> ConvertResult<T> for Result<T, E> {
    fn err_group(self, group: &Group) -> FitFileResult<T> {
        self.map_err(|error| error.into().with_path(group.name()))
    }

    fn err_dataset(self, dataset: &Dataset) -> FitFileResult<T> {
        self.map_err(|error| error.into().with_path(dataset.name()))
    }
}

pub(crate) fn open_file(path: &Path) -> FitFileResult<File> {
    File::open(path).map_err(|error| FitFileError::Hdf5 {
        error,
        path: Some(path.display().to_string()),
    })
}

pub(crate) fn create_file(path: &Path) -> FitFileResult<File> {
    File::create(path).map_err(|error| FitFileError::Hdf5 {
        error,
        path: Some(path.display().to_string()),
    })
}

pub(crate) trait GroupExt {
    /// Reads a whole one-dimensional dataset.
    fn get_array<T: H5Type>(&self, name: &str) -> FitFileResult<Array1<T>>;

    /// As [GroupExt::get_array], but a missing dataset is `None` rather than
    /// an error.
    fn get_optional_array<T: H5Type>(&self, name: &str) -> FitFileResult<Option<Array1<T>>>;

    fn set_array<T: H5Type>(&self, name: &str, data: &Array1<T>) -> FitFileResult<()>;

    fn set_scalar_attribute<T: H5Type>(&self, name: &str, value: &T) -> FitFileResult<()>;

    fn set_string_attribute(&self, name: &str, value: &str) -> FitFileResult<()>;
}

impl GroupExt for Group {
    fn get_array<T: H5Type>(&self, name: &str) -> FitFileResult<Array1<T>> {
        let dataset = self.dataset(name).err_group(self)?;
        dataset.read_1d::<T>().err_dataset(&dataset)
    }

    fn get_optional_array<T: H5Type>(&self, name: &str) -> FitFileResult<Option<Array1<T>>> {
        if self.link_exists(name) {
            Ok(Some(self.get_array(name)?))
        } else {
            Ok(None)
        }
    }

    fn set_array<T: H5Type>(&self, name: &str, data: &Array1<T>) -> FitFileResult<()> {
        self.new_dataset_builder()
            .with_data(data.view())
            .create(name)
            .err_group(self)?;
        Ok(())
    }

    fn set_scalar_attribute<T: H5Type>(&self, name: &str, value: &T) -> FitFileResult<()> {
        let attr = self.new_attr::<T>().create(name).err_group(self)?;
        attr.write_scalar(value).err_group(self)
    }

    fn set_string_attribute(&self, name: &str, value: &str) -> FitFileResult<()> {
        let attr = self.new_attr::<VarLenUnicode>().create(name).err_group(self)?;
        attr.write_scalar(&value.parse::<VarLenUnicode>().err_group(self)?)
            .err_group(self)
    }
}
