//! Command-line front end shared by the `create_small_file` binaries.

pub mod app;
pub mod cli;
