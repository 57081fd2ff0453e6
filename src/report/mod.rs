//! Allure reporting
//!
//! This module contains:
//! - `model` - The subset of the Allure results format we write
//! - `allure` - Step and attachment bridge writing `*-result.json` files
//! - `compressor` - Zip and tar.gz archiving of a results directory
//! - `archiver` - Post-run archiving into `target/`

pub mod allure;
pub mod archiver;
pub mod compressor;
pub mod model;

pub use allure::AllureReporter;
pub use archiver::{downloads_dir, ReportArchiver};
pub use compressor::{
    default_tar_gz_file_name, default_zip_file_name, tar_gz_directory, zip_directory,
    ArchiveFormat,
};
pub use model::{Attachment, Label, Stage, Status, StatusDetails, StepResult, TestResult};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Path {0} is outside the directory being archived")]
    OutsideRoot(PathBuf),

    #[error("Home directory could not be determined")]
    NoHomeDir,
}
