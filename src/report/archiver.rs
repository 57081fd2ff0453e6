//! Post-run archiving of the Allure results directory

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::compressor::ArchiveFormat;
use super::ReportError;

pub const RESULTS_DIR_NAME: &str = "allure-results";
pub const OUTPUT_DIR_NAME: &str = "target";

/// Compresses `<root>/allure-results` into an archive under an output directory.
#[derive(Debug, Clone)]
pub struct ReportArchiver {
    root: PathBuf,
    results_dir: PathBuf,
    out_dir: PathBuf,
    format: ArchiveFormat,
}

impl ReportArchiver {
    /// Archiver for `root`, writing a tar.gz to `<root>/target`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            results_dir: root.join(RESULTS_DIR_NAME),
            out_dir: root.join(OUTPUT_DIR_NAME),
            root,
            format: ArchiveFormat::default(),
        }
    }

    /// Archiver rooted at the current working directory
    pub fn for_current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn with_results_dir(mut self, results_dir: impl AsRef<Path>) -> Self {
        self.results_dir = self.root.join(results_dir);
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = format;
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Compress the results directory, returning the archive path.
    pub fn try_archive(&self) -> Result<Option<PathBuf>, ReportError> {
        if !self.results_dir.is_dir() {
            warn!("No Allure results at {}, nothing to archive", self.results_dir.display());
            return Ok(None);
        }
        std::fs::create_dir_all(&self.out_dir)?;
        let dest = self.out_dir.join(self.format.default_file_name());
        self.format.compress(&self.results_dir, &dest)?;
        info!("Allure results archived to {}", dest.display());
        Ok(Some(dest))
    }

    /// Like [`ReportArchiver::try_archive`], but failures are logged and dropped.
    pub fn archive(&self) -> Option<PathBuf> {
        match self.try_archive() {
            Ok(dest) => dest,
            Err(e) => {
                warn!("Failed to archive Allure results: {}", e);
                None
            }
        }
    }
}

/// `~/Downloads`, created when missing
pub fn downloads_dir() -> Result<PathBuf, ReportError> {
    let home = dirs::home_dir().ok_or(ReportError::NoHomeDir)?;
    let downloads = home.join("Downloads");
    std::fs::create_dir_all(&downloads)?;
    Ok(downloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_archive_without_results_is_noop() {
        let dir = tempdir().unwrap();
        let archiver = ReportArchiver::new(dir.path());
        assert!(archiver.archive().is_none());
        assert!(!dir.path().join(OUTPUT_DIR_NAME).exists());
    }

    #[test]
    fn test_archive_writes_into_target() {
        let dir = tempdir().unwrap();
        let results = dir.path().join(RESULTS_DIR_NAME);
        std::fs::create_dir_all(&results).unwrap();
        std::fs::write(results.join("a-result.json"), "{}").unwrap();

        let archive = ReportArchiver::new(dir.path()).archive().unwrap();
        assert!(archive.starts_with(dir.path().join(OUTPUT_DIR_NAME)));
        assert!(archive.to_string_lossy().ends_with(".tar.gz"));
        assert!(archive.is_file());
    }

    #[test]
    fn test_zip_format_and_custom_out_dir() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        let results = dir.path().join("custom-results");
        std::fs::create_dir_all(&results).unwrap();
        std::fs::write(results.join("x.txt"), "x").unwrap();

        let archive = ReportArchiver::new(dir.path())
            .with_results_dir("custom-results")
            .with_out_dir(out.path())
            .with_format(ArchiveFormat::Zip)
            .archive()
            .unwrap();
        assert_eq!(archive.parent(), Some(out.path()));
        assert!(archive.to_string_lossy().ends_with(".zip"));
    }
}
