use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::PdfFile;

/// No document survived scanning and extraction. Fatal at initialization:
/// a controller must not be constructed over an empty knowledge base.
#[derive(Debug)]
pub struct EmptyCorpusError {
    pub scanned: usize,
    pub skipped: usize,
}

impl std::fmt::Display for EmptyCorpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scanned == 0 {
            write!(f, "corpus is empty: no PDF files found")
        } else {
            write!(
                f,
                "corpus is empty: all {} PDF files failed extraction ({} skipped)",
                self.scanned, self.skipped
            )
        }
    }
}

impl std::error::Error for EmptyCorpusError {}

/// Enumerate PDF files one directory level under the corpus folder.
/// Results are sorted by file name so downstream indexing is deterministic.
pub fn scan_corpus(config: &CorpusConfig) -> Result<Vec<PdfFile>> {
    let root = &config.dir;
    if !root.exists() {
        bail!("Corpus directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).min_depth(1).max_depth(1);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if !include_set.is_match(&file_name) {
            continue;
        }

        let metadata = std::fs::metadata(entry.path())?;
        let modified = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        let modified_secs = modified
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        files.push(PdfFile {
            path: entry.path().to_path_buf(),
            file_name,
            modified_at: Utc.timestamp_opt(modified_secs, 0).unwrap(),
        });
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
