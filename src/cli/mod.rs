//! Command Line Interface (CLI) layer for `dlsc`.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`): load the config, read the soil
//! grid, resolve the region and point selection, then build and write the
//! site file and companion raster through `ldndc_site::api`.
//!
//! If you are embedding the site builder into another application, prefer
//! the high-level `ldndc_site::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
