//! Zip archiver

use crate::archive::{ArchiveError, Archiver};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes `<archive_root>/<directory name>.zip` for each packaged directory
#[derive(Debug, Clone)]
pub struct ZipArchiver {
    archive_root: PathBuf,
}

impl ZipArchiver {
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
        }
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn package(&self, source: &Path) -> Result<PathBuf, ArchiveError> {
        if !source.is_dir() {
            return Err(ArchiveError::MissingSource(source.to_path_buf()));
        }

        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::UnnamedSource(source.to_path_buf()))?;
        let target = self.archive_root.join(format!("{}.zip", name));

        let source = source.to_path_buf();
        let destination = target.clone();
        let entries = tokio::task::spawn_blocking(move || write_zip(&source, &destination))
            .await
            .map_err(|e| ArchiveError::Aborted(e.to_string()))??;

        tracing::info!("Wrote archive {} ({} files)", target.display(), entries);
        Ok(target)
    }
}

/// Writes every file under `source` into a new zip at `destination`
///
/// Returns the number of file entries written.
fn write_zip(source: &Path, destination: &Path) -> Result<usize, ArchiveError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut files = Vec::new();
    collect_files(source, source, &mut files)?;
    files.sort();

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(File::create(destination)?);

    for relative in &files {
        let entry_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        writer.start_file(entry_name, options)?;
        let mut input = File::open(source.join(relative))?;
        io::copy(&mut input, &mut writer)?;
    }

    writer.finish()?;
    Ok(files.len())
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &path, files)?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
    }
    Ok(())
}
