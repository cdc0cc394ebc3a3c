use anyhow::{Context, Result};
use log::info;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::archive::{self, EntryInfo};
use crate::cli::SplitArgs;
use crate::pathutil::{file_stem, gib, GIB};
use crate::progress::{IndicatifProgress, ProgressSink};
use crate::prompt::{pick, Escape, Prompt};
use crate::scan;

#[derive(Debug)]
pub enum SplitOutcome {
    /// The archive already fits; nothing was written.
    NotNeeded { size: u64 },
    Split(Vec<PathBuf>),
}

/// Greedy first-fit packing in the given order. A part is closed when the
/// next entry would push it past `max` and it already holds something, so an
/// entry larger than `max` ends up alone in its own part.
pub fn plan_parts(entries: &[EntryInfo], max: u64) -> Vec<Vec<EntryInfo>> {
    let mut parts = Vec::new();
    let mut current: Vec<EntryInfo> = Vec::new();
    let mut current_size = 0u64;
    for e in entries {
        if current_size.saturating_add(e.size) > max && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size = current_size.saturating_add(e.size);
        current.push(e.clone());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Splits `input` into parts of at most `max` uncompressed bytes each, written
/// to `out_dir` under names built from `pattern`.
pub fn split_archive(
    input: &Path,
    out_dir: &Path,
    max: u64,
    pattern: &str,
    force: bool,
    progress: &dyn ProgressSink,
) -> Result<SplitOutcome> {
    let size = archive::uncompressed_size(input).with_context(|| format!("cannot read archive {}", input.display()))?;
    if size <= max {
        return Ok(SplitOutcome::NotNeeded { size });
    }
    let mut entries = archive::entries(input)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;
    let base = file_stem(input);
    let parts = plan_parts(&entries, max);
    let mut source = archive::open(input)?;

    progress.set_len(parts.len() as u64);
    progress.set_message(Cow::from("Splitting..."));
    let mut written = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        let mut out_path = out_dir.join(fill_pattern(pattern, base, idx + 1));
        if out_path.exists() && !force {
            out_path = ensure_unique_path(&out_path);
        }
        archive::copy_entries(&mut source, part, &out_path)
            .with_context(|| format!("cannot write {}", out_path.display()))?;
        info!("wrote {} entries to {}", part.len(), out_path.display());
        written.push(out_path);
        progress.inc(1);
    }
    progress.finish(Cow::from("Split complete"));
    Ok(SplitOutcome::Split(written))
}

fn fill_pattern(pattern: &str, base: &str, index: usize) -> String {
    pattern
        .replace("{base}", base)
        .replace("{index}", &index.to_string())
}

fn ensure_unique_path(p: &Path) -> PathBuf {
    let parent = p.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let stem = file_stem(p);
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut i = 1;
    loop {
        let mut name = format!("{stem}_{i}");
        if !ext.is_empty() { name.push('.'); name.push_str(ext); }
        let cand = parent.join(name);
        if !cand.exists() || i >= 10000 { return cand; }
        i += 1;
    }
}

fn on_disk_gib(p: &Path) -> f64 {
    std::fs::metadata(p).map(|m| gib(m.len())).unwrap_or(0.0)
}

pub fn run(args: &SplitArgs, p: &mut dyn Prompt) -> Result<()> {
    let max = (args.max_size * GIB) as u64;
    let input = match &args.input {
        Some(i) => i.clone(),
        None => {
            let files = scan::collect_archives(&args.downloads_dir).unwrap_or_default();
            if files.is_empty() {
                p.say("No CBZ files found in the downloads directory!");
                return Ok(());
            }
            p.say("\nAvailable manga files:");
            for (i, f) in files.iter().enumerate() {
                let name = f.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                p.say(&format!("{}. {} ({:.2}GB)", i + 1, name, on_disk_gib(f)));
            }
            let Some(choice) = pick(p, "\nSelect a manga to split (enter number): ", files.len(), Escape::None)? else {
                return Ok(());
            };
            files[choice].clone()
        }
    };

    let not_needed = format!("File is already smaller than {}GB. No splitting needed.", args.max_size);
    let size = archive::uncompressed_size(&input).with_context(|| format!("cannot read archive {}", input.display()))?;
    if size <= max {
        p.say(&not_needed);
        return Ok(());
    }

    let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    p.say(&format!("\nSplitting {name} into parts..."));
    let progress = IndicatifProgress::new(0, "Parts");
    match split_archive(&input, &args.output_dir, max, &args.pattern, args.force, &progress)? {
        SplitOutcome::NotNeeded { .. } => p.say(&not_needed),
        SplitOutcome::Split(files) => {
            p.say(&format!("\nSplit complete! Created {} files:", files.len()));
            for f in &files {
                let n = f.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                p.say(&format!("- {} ({:.2}GB)", n, on_disk_gib(f)));
            }
        }
    }
    Ok(())
}
