//! HDF5 readers for the trigger and template-bank inputs, and the writer for
//! the per-template fit results.
pub(crate) mod bank;
pub(crate) mod results;
pub(crate) mod triggers;
