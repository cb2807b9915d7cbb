//! Screen-result discovery and batch loading.
//!
//! Given a data directory, finds every `screen_results_YYYY-MM-DD.json[.gz]`
//! inside the requested date window and decodes them into a [`ScreenBatch`].
//! Loading policy:
//! 1. Files outside the window or with foreign names are ignored
//! 2. When both plain and gzip copies exist for a date, the plain one wins
//! 3. A file that cannot be read or decoded is reported and skipped; the
//!    remaining files still load

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use rayon::prelude::*;
use screenlab_core::ScreenBatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::screen_file::{decode, episodes, DecodeError, ScreenFile};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data directory '{0}' does not exist")]
    DataDirMissing(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{0}' is not a screen_results_YYYY-MM-DD.json[.gz] file")]
    InvalidFileName(PathBuf),
}

impl LoadError {
    fn from_decode(path: &Path, err: DecodeError) -> Self {
        let path = path.to_path_buf();
        match err {
            DecodeError::Gzip(source) => LoadError::Io { path, source },
            DecodeError::Json(source) => LoadError::Json { path, source },
        }
    }
}

/// Options controlling which files are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Last signal date of the window. `None` means no upper bound.
    pub as_of: Option<NaiveDate>,
    /// Number of calendar days in the window, ending at `as_of`.
    /// `None` loads every file up to `as_of`.
    pub lookback_days: Option<u32>,
    /// Decode files on the rayon pool.
    pub parallel: bool,
}

impl LoadOptions {
    /// Window of the last `days` days ending at `as_of`, as the dashboard used.
    pub fn last_days(as_of: NaiveDate, days: u32) -> Self {
        Self {
            as_of: Some(as_of),
            lookback_days: Some(days),
            parallel: true,
        }
    }

    /// Whether a signal date falls inside the window.
    pub fn includes(&self, date: NaiveDate) -> bool {
        if let Some(as_of) = self.as_of {
            if date > as_of {
                return false;
            }
            if let Some(days) = self.lookback_days {
                if days == 0 {
                    return false;
                }
                // A window reaching past chrono's earliest date has no lower bound.
                let first = as_of.checked_sub_days(Days::new(u64::from(days - 1)));
                if first.is_some_and(|first| date < first) {
                    return false;
                }
            }
        }
        true
    }
}

/// What was loaded from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub compressed: bool,
    pub ticker_count: usize,
    /// Screener score per ticker, where the file carried one.
    pub scores: BTreeMap<String, f64>,
}

/// A file that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// Result of loading a data directory.
#[derive(Debug, Clone, Default)]
pub struct LoadedBatch {
    pub batch: ScreenBatch,
    pub files: Vec<FileSummary>,
    pub errors: Vec<FileError>,
}

impl LoadedBatch {
    pub fn series_count(&self) -> usize {
        self.batch.values().map(|m| m.len()).sum()
    }
}

/// List screen-result files in `dir` inside the options' window, oldest first.
pub fn discover_files(dir: &Path, opts: &LoadOptions) -> Result<Vec<ScreenFile>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::DataDirMissing(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut by_date: BTreeMap<NaiveDate, ScreenFile> = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(file) = ScreenFile::from_path(&entry.path()) else {
            continue;
        };
        if !opts.includes(file.date) {
            continue;
        }
        match by_date.get(&file.date) {
            Some(existing) if !existing.compressed => {
                tracing::debug!(path = %file.path.display(), "duplicate date, keeping plain JSON");
            }
            _ => {
                by_date.insert(file.date, file);
            }
        }
    }

    let files: Vec<ScreenFile> = by_date.into_values().collect();
    tracing::info!(dir = %dir.display(), count = files.len(), "discovered screen files");
    Ok(files)
}

/// Read and decode one file into (summary, episodes by ticker).
fn load_file(
    file: &ScreenFile,
) -> Result<(FileSummary, BTreeMap<String, Vec<screenlab_core::RawCandle>>), LoadError> {
    let bytes = std::fs::read(&file.path).map_err(|source| LoadError::Io {
        path: file.path.clone(),
        source,
    })?;
    let result =
        decode(&bytes, file.compressed).map_err(|e| LoadError::from_decode(&file.path, e))?;

    let scores = result
        .iter()
        .filter_map(|(ticker, entry)| Some((ticker.clone(), entry.as_ref()?.score()?)))
        .collect();
    let summary = FileSummary {
        date: file.date,
        path: file.path.clone(),
        compressed: file.compressed,
        ticker_count: result.len(),
        scores,
    };
    Ok((summary, episodes(&result, file.date)))
}

/// Decode `files` into one batch. Per-file failures are collected, not fatal.
pub fn load_files(files: &[ScreenFile], parallel: bool) -> LoadedBatch {
    let results: Vec<_> = if parallel {
        files.par_iter().map(|f| (f, load_file(f))).collect()
    } else {
        files.iter().map(|f| (f, load_file(f))).collect()
    };

    let mut loaded = LoadedBatch::default();
    for (file, result) in results {
        match result {
            Ok((summary, by_ticker)) => {
                tracing::debug!(
                    date = %summary.date,
                    tickers = summary.ticker_count,
                    "loaded screen file"
                );
                loaded.batch.insert(file.date_key(), by_ticker);
                loaded.files.push(summary);
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping screen file");
                loaded.errors.push(FileError {
                    path: file.path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    loaded
}

/// Load a single named screen file. Unlike directory loading, a decode
/// failure here is an error.
pub fn load_file_path(path: &Path) -> Result<LoadedBatch, LoadError> {
    let file = ScreenFile::from_path(path)
        .ok_or_else(|| LoadError::InvalidFileName(path.to_path_buf()))?;
    let (summary, by_ticker) = load_file(&file)?;
    let mut loaded = LoadedBatch::default();
    loaded.batch.insert(file.date_key(), by_ticker);
    loaded.files.push(summary);
    Ok(loaded)
}

/// Discover and load every screen file in `dir` that matches `opts`.
pub fn load_dir(dir: &Path, opts: &LoadOptions) -> Result<LoadedBatch, LoadError> {
    let files = discover_files(dir, opts)?;
    Ok(load_files(&files, opts.parallel))
}
