//! Corpus directory loading.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use canonical::normalize_text;
use perceptual::{ShingleGenerator, ShingleSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Counts from a corpus load.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusReport {
    /// Files added to the index.
    pub indexed: usize,
    /// Matching files or directory entries that could not be read.
    pub skipped: usize,
}

/// A corpus file after normalization and shingling.
#[derive(Debug, Clone)]
pub(crate) struct CorpusDocument {
    pub(crate) name: String,
    pub(crate) normalized: String,
    pub(crate) shingles: ShingleSet,
}

/// Read every file in `dir` whose name ends with `.extension`
/// (case-insensitive), in file-name order. A bare `.txt` counts too.
///
/// Never fails: a missing or unreadable directory yields an empty corpus and
/// unreadable files are counted in the returned skip count.
pub(crate) fn read_corpus(
    dir: &Path,
    extension: &str,
    shingler: &ShingleGenerator,
) -> (Vec<CorpusDocument>, usize) {
    let (paths, mut skipped) = match list_corpus_files(dir, extension) {
        Ok(found) => found,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "corpus directory unavailable, starting with empty corpus");
            return (Vec::new(), 0);
        }
    };

    let loaded: Vec<Result<CorpusDocument, (PathBuf, io::Error)>> = paths
        .into_par_iter()
        .map(|path| {
            let raw = fs::read_to_string(&path).map_err(|err| (path.clone(), err))?;
            let normalized = normalize_text(&raw);
            let shingles = shingler.shingles(&normalized);
            Ok(CorpusDocument {
                name: file_name(&path),
                normalized,
                shingles,
            })
        })
        .collect();

    let mut docs = Vec::with_capacity(loaded.len());
    for entry in loaded {
        match entry {
            Ok(doc) => docs.push(doc),
            Err((path, err)) => {
                warn!(path = %path.display(), error = %err, "failed to read corpus file");
                skipped += 1;
            }
        }
    }
    (docs, skipped)
}

fn list_corpus_files(dir: &Path, extension: &str) -> io::Result<(Vec<PathBuf>, usize)> {
    let mut paths = Vec::new();
    let mut skipped = 0;

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read corpus directory entry");
                skipped += 1;
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_extension(&path, extension) {
            paths.push(path);
        }
    }

    paths.sort_by_key(|path| file_name(path));
    Ok((paths, skipped))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let suffix = format!(".{}", extension.trim_start_matches('.')).to_lowercase();
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| name.ends_with(&suffix))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
