use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::chapter::{self, ArchiveChapter};
use crate::error::CbzError;
use crate::pathutil::{file_stem, has_extension};

pub const COMBINED_SUFFIX: &str = "_combined.cbz";

/// All `.cbz` files under `dir`, at any depth, sorted by path.
pub fn collect_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("directory does not exist: {}", dir.display());
    }
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_extension(e.path(), &["cbz"]))
        .map(|e| e.path().to_owned())
        .collect();
    out.sort();
    Ok(out)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read directory {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

fn dir_name(p: &Path) -> String {
    p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MangaDir {
    pub name: String,
    pub path: PathBuf,
    /// `<name>_combined.cbz` already sits next to the directory.
    pub combined: bool,
}

/// Directories of `source` that hold at least one chapter subdirectory.
pub fn manga_dirs(source: &Path) -> Result<Vec<MangaDir>> {
    let mut out = Vec::new();
    for path in subdirs(source)? {
        if subdirs(&path)?.is_empty() {
            continue;
        }
        let name = dir_name(&path);
        let combined = source.join(format!("{name}{COMBINED_SUFFIX}")).exists();
        out.push(MangaDir { name, path, combined });
    }
    Ok(out)
}

/// Chapter subdirectories ordered by chapter key; unparseable names last.
pub fn chapter_dirs(manga_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = subdirs(manga_dir)?;
    dirs.sort_by(|a, b| chapter::compare_names(&dir_name(a), &dir_name(b)));
    Ok(dirs)
}

fn is_chapter_archive(p: &Path) -> bool {
    has_extension(p, &["cbz"]) && !dir_name(p).ends_with(COMBINED_SUFFIX)
}

/// Per-chapter archives in a manga download folder, in numeric chapter order.
/// A chapter archive whose name carries no `Chapter_<n>` number is an error.
pub fn chapter_archives(folder: &Path) -> Result<Vec<(ArchiveChapter, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("cannot read directory {}", folder.display()))? {
        let path = entry?.path();
        if !path.is_file() || !is_chapter_archive(&path) {
            continue;
        }
        let stem = file_stem(&path);
        let key = ArchiveChapter::parse(stem).ok_or_else(|| CbzError::InvalidArchiveName(stem.to_string()))?;
        out.push((key, path));
    }
    out.sort();
    Ok(out)
}

/// Labels of chapters already downloaded into `folder`, normalised with
/// [`chapter::normalize_label`].
pub fn downloaded_labels(folder: &Path) -> Result<BTreeSet<String>> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^Chapter_(\d+\.?\d*)").expect("static archive pattern"));
    let mut out = BTreeSet::new();
    if !folder.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() || !is_chapter_archive(&path) {
            continue;
        }
        if let Some(caps) = re.captures(&dir_name(&path)) {
            out.insert(chapter::normalize_label(caps[1].trim_end_matches('.')));
        }
    }
    Ok(out)
}

/// Deletes the per-chapter archives of a download folder.
pub fn remove_chapter_archives(folder: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && is_chapter_archive(&path) {
            fs::remove_file(&path).with_context(|| format!("cannot remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
