//! Report directory compression
//!
//! Entries are written for regular files only, named by their path relative
//! to the source directory with `/` separators.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use zip::write::SimpleFileOptions;

use super::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    Zip,
    #[default]
    TarGz,
}

impl ArchiveFormat {
    pub fn default_file_name(&self) -> String {
        match self {
            ArchiveFormat::Zip => default_zip_file_name(),
            ArchiveFormat::TarGz => default_tar_gz_file_name(),
        }
    }

    pub fn compress(&self, src: &Path, dest: &Path) -> Result<(), ReportError> {
        match self {
            ArchiveFormat::Zip => zip_directory(src, dest),
            ArchiveFormat::TarGz => tar_gz_directory(src, dest),
        }
    }
}

/// `allure-YYYY-MM-DD-HHMMSS.zip` in local time
pub fn default_zip_file_name() -> String {
    format!("{}.zip", timestamped_stem())
}

/// `allure-YYYY-MM-DD-HHMMSS.tar.gz` in local time
pub fn default_tar_gz_file_name() -> String {
    format!("{}.tar.gz", timestamped_stem())
}

fn timestamped_stem() -> String {
    format!("allure-{}", chrono::Local::now().format("%Y-%m-%d-%H%M%S"))
}

pub fn zip_directory(src: &Path, dest: &Path) -> Result<(), ReportError> {
    let Some(files) = collect_files(src)? else {
        return Ok(());
    };

    let mut writer = zip::ZipWriter::new(File::create(dest)?);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, path) in &files {
        debug!("Adding {} to zip", name);
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&std::fs::read(path)?)?;
    }
    writer.finish()?;

    info!("Compressed {} files from {} into {}", files.len(), src.display(), dest.display());
    Ok(())
}

pub fn tar_gz_directory(src: &Path, dest: &Path) -> Result<(), ReportError> {
    let Some(files) = collect_files(src)? else {
        return Ok(());
    };

    let encoder = GzEncoder::new(File::create(dest)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, path) in &files {
        debug!("Adding {} to tar.gz", name);
        builder.append_path_with_name(path, name)?;
    }
    builder.into_inner()?.finish()?;

    info!("Compressed {} files from {} into {}", files.len(), src.display(), dest.display());
    Ok(())
}

/// Files under `src` in depth-first order, or `None` when `src` is not a directory.
fn collect_files(src: &Path) -> Result<Option<Vec<(String, PathBuf)>>, ReportError> {
    if !src.is_dir() {
        error!("Directory to compress does not exist: {}", src.display());
        return Ok(None);
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| ReportError::OutsideRoot(entry.path().to_path_buf()))?;
        files.push((entry_name(relative), entry.path().to_path_buf()));
    }
    Ok(Some(files))
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_file_names() {
        let zip = default_zip_file_name();
        assert!(zip.starts_with("allure-"));
        assert!(zip.ends_with(".zip"));
        // allure- + YYYY-MM-DD-HHMMSS + .zip
        assert_eq!(zip.len(), "allure-".len() + 17 + ".zip".len());

        let tgz = default_tar_gz_file_name();
        assert!(tgz.ends_with(".tar.gz"));
        assert_eq!(ArchiveFormat::default(), ArchiveFormat::TarGz);
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let relative = Path::new("data").join("nested").join("a.json");
        assert_eq!(entry_name(&relative), "data/nested/a.json");
    }

    #[test]
    fn test_missing_source_writes_nothing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.zip");
        zip_directory(&dir.path().join("missing"), &dest).unwrap();
        assert!(!dest.exists());

        let dest = dir.path().join("out.tar.gz");
        tar_gz_directory(&dir.path().join("missing"), &dest).unwrap();
        assert!(!dest.exists());
    }
}
