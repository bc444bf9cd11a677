//! Per-model zip archives.
//!
//! Each model's sanitized records are written to `<dir>/<model stem>.zip`.
//! Archives are assembled in a temporary file inside the target directory
//! and renamed into place, so a failed write never leaves a partial archive.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::parser::FileRecord;
use crate::sanitize::{archive_stem, dedupe_records};

/// Extension used for every archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// One written archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelArchive {
    pub model: String,
    /// Sanitized records, in entry order.
    pub records: Vec<FileRecord>,
    pub path: PathBuf,
}

/// Writes model archives into a single directory.
#[derive(Debug, Clone)]
pub struct Archiver {
    dir: PathBuf,
}

impl Archiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes one archive per model that has records.
    ///
    /// Models without records are skipped. A model whose archive cannot be
    /// written is logged and skipped without affecting the others. The only
    /// error returned is failure to create the target directory.
    pub async fn write_archives(
        &self,
        outputs: Vec<(String, Vec<FileRecord>)>,
    ) -> Result<Vec<ModelArchive>, ArchiveError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut used_stems = HashSet::new();
        let mut archives = Vec::new();

        for (model, records) in outputs {
            if records.is_empty() {
                debug!(model = %model, "No files extracted, skipping archive");
                continue;
            }

            let stem = unique_stem(archive_stem(&model), &mut used_stems);
            let path = self.dir.join(format!("{stem}.{ARCHIVE_EXTENSION}"));

            match self.write_model(&model, records, path).await {
                Ok(archive) => {
                    info!(
                        model = %archive.model,
                        archive = %archive.path.display(),
                        entries = archive.records.len(),
                        "Archive written"
                    );
                    archives.push(archive);
                }
                Err(e) => warn!(model = %model, error = %e, "Failed to write archive"),
            }
        }

        Ok(archives)
    }

    /// Sanitizes `records` and writes them to `path`.
    pub async fn write_model(
        &self,
        model: &str,
        records: Vec<FileRecord>,
        path: PathBuf,
    ) -> Result<ModelArchive, ArchiveError> {
        let records = dedupe_records(records);
        if records.is_empty() {
            return Err(ArchiveError::EmptyModel(model.to_string()));
        }

        let dir = self.dir.clone();
        let (records, path) = tokio::task::spawn_blocking(move || {
            write_zip(&dir, &path, &records)?;
            Ok::<_, ArchiveError>((records, path))
        })
        .await
        .map_err(|e| ArchiveError::Worker(e.to_string()))??;

        Ok(ModelArchive {
            model: model.to_string(),
            records,
            path,
        })
    }
}

/// Appends `_2`, `_3`, ... when two models map to the same stem.
fn unique_stem(stem: String, used: &mut HashSet<String>) -> String {
    if used.insert(stem.clone()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn write_zip(dir: &Path, path: &Path, records: &[FileRecord]) -> Result<(), ArchiveError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        for record in records {
            let zip_err = |source| ArchiveError::Zip {
                path: path.to_path_buf(),
                entry: record.filename.clone(),
                source,
            };
            zip.start_file(record.filename.as_str(), options)
                .map_err(zip_err)?;
            zip.write_all(record.content.as_bytes())?;
        }
        zip.finish().map_err(|source| ArchiveError::Zip {
            path: path.to_path_buf(),
            entry: String::new(),
            source,
        })?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ArchiveError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
