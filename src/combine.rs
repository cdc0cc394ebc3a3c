use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::chapter;
use crate::error::CbzError;
use crate::pathutil::{has_extension, sanitize_path_input};
use crate::progress::{IndicatifProgress, ProgressSink};
use crate::prompt::{pick, yes_no, Escape, Prompt};
use crate::scan::{self, COMBINED_SUFFIX};

pub const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Default)]
pub struct CombineReport {
    pub chapters: usize,
    pub pages: usize,
    /// Directories whose name carried no chapter number.
    pub skipped: Vec<String>,
    /// Directories whose padded key was already used by an earlier one.
    pub collisions: Vec<String>,
}

/// Combines every chapter directory of `manga_dir` into one archive at
/// `output`. Pages are renamed `<padded key>_<3-digit index><ext>`; keys are
/// padded to four digits, or to the widest key when one needs more.
pub fn combine_chapters(manga_dir: &Path, output: &Path, progress: &dyn ProgressSink) -> Result<CombineReport> {
    let dirs = scan::chapter_dirs(manga_dir)?;
    if dirs.is_empty() {
        return Err(CbzError::NoChapters(manga_dir.to_path_buf()).into());
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).with_context(|| format!("cannot create output directory {}", parent.display()))?;
    }

    let scratch = tempfile::tempdir().context("cannot create scratch directory")?;
    let mut report = CombineReport::default();
    let mut used = HashSet::new();
    progress.set_len(dirs.len() as u64);
    progress.set_message("Processing chapters".into());

    let mut keyed = Vec::with_capacity(dirs.len());
    for dir in &dirs {
        let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match chapter::extract_chapter_number(&name) {
            Some(key) => keyed.push((dir, name, key)),
            None => {
                warn!("Could not extract chapter number from directory: {name}");
                report.skipped.push(name);
                progress.inc(1);
            }
        }
    }
    let width = chapter::key_width(keyed.iter().map(|(_, _, k)| *k));

    for (dir, name, key) in keyed {
        progress.inc(1);
        let prefix = key.padded(width);
        if !used.insert(prefix.clone()) {
            warn!("{name} maps to chapter {prefix} like an earlier directory; its pages replace the earlier ones");
            report.collisions.push(name.clone());
        }
        report.pages += copy_chapter(dir, scratch.path(), &prefix)
            .with_context(|| format!("cannot copy pages of {}", dir.display()))?;
        report.chapters += 1;
    }

    archive::write_dir(scratch.path(), output, None)
        .with_context(|| format!("cannot write {}", output.display()))?;
    progress.finish("combined".into());
    info!("combined {} chapters of {} into {}", report.chapters, manga_dir.display(), output.display());
    Ok(report)
}

fn copy_chapter(dir: &Path, scratch: &Path, prefix: &str) -> Result<usize> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_extension(p, IMAGE_EXTS))
        .collect();
    images.sort();
    for (i, img) in images.iter().enumerate() {
        let ext = img.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        let target = scratch.join(format!("{prefix}_{:03}.{ext}", i + 1));
        fs::copy(img, &target)?;
    }
    Ok(images.len())
}

enum Step {
    Combined,
    Skipped,
}

/// Interactive loop: choose a source directory, then combine mangas from it
/// until the user is done.
pub fn run(default_source: &Path, p: &mut dyn Prompt) -> Result<()> {
    p.say(&format!("\nDefault manga directory: {}", default_source.display()));
    let source = if yes_no(p, "Use default directory? (y/n) [y]: ", Some(true))? {
        default_source.to_path_buf()
    } else {
        sanitize_path_input(&p.ask("Enter the source directory path (where manga directories are located): ")?)
    };
    if !source.is_dir() {
        return Err(CbzError::SourceMissing(source).into());
    }

    loop {
        match combine_one(&source, p) {
            Ok(Step::Skipped) => continue,
            Ok(Step::Combined) => {
                if !yes_no(p, "\nDo you want to process another manga? (y/n) [y]: ", Some(true))? {
                    break;
                }
            }
            Err(e) => {
                p.say(&format!("\nError: {e:#}"));
                if !yes_no(p, "\nDo you want to try another manga? (y/n) [y]: ", Some(true))? {
                    break;
                }
            }
        }
    }
    p.say("\nExiting program. Goodbye!");
    Ok(())
}

fn combine_one(source: &Path, p: &mut dyn Prompt) -> Result<Step> {
    let dirs = scan::manga_dirs(source)?;
    if dirs.is_empty() {
        anyhow::bail!("No manga directories found in the source directory");
    }
    p.say("\nAvailable manga:");
    for (i, d) in dirs.iter().enumerate() {
        let status = if d.combined { " [Already Combined]" } else { "" };
        p.say(&format!("{}. {}{}", i + 1, d.name, status));
    }
    let question = "\nEnter the number of the manga you want to combine (or 'q' to quit): ";
    let Some(choice) = pick(p, question, dirs.len(), Escape::Key('q'))? else {
        return Err(CbzError::Cancelled.into());
    };
    let manga = &dirs[choice];

    let file_name = format!("{}{}", manga.name, COMBINED_SUFFIX);
    let output = source.join(&file_name);
    if output.exists() {
        let question = format!("\nFile '{file_name}' already exists. Overwrite? (y/n) [y]: ");
        if !yes_no(p, &question, Some(true))? {
            p.say("\nSkipping this manga. Returning to selection...");
            return Ok(Step::Skipped);
        }
    }

    p.say(&format!("\nCombining chapters for {}...", manga.name));
    let progress = IndicatifProgress::new(0, "Processing chapters");
    let report = combine_chapters(&manga.path, &output, &progress)?;
    for name in &report.skipped {
        p.say(&format!("Warning: Could not extract chapter number from directory: {name}"));
    }
    p.say(&format!("\nSuccessfully created combined CBZ file: {file_name}"));
    Ok(Step::Combined)
}
