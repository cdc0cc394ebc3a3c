use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::chapter::ArchiveChapter;
use crate::error::Result;
use crate::pathutil::has_extension;
use crate::progress::ProgressSink;

pub const METADATA_ENTRY: &str = "metadata.txt";
const NESTED_ARCHIVE_EXTS: &[&str] = &["cbz", "zip"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Position in the source archive.
    pub index: usize,
    pub name: String,
    /// Uncompressed size.
    pub size: u64,
}

fn options_for(size: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= u32::MAX as u64)
}

/// Files directly inside `dir`, sorted by name. Archives are left out so an
/// output never nests another CBZ.
pub fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && !has_extension(&path, NESTED_ARCHIVE_EXTS) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Writes every file of `dir` (sorted by name) into a new archive at `output`,
/// followed by an optional `metadata.txt` entry.
pub fn write_dir(dir: &Path, output: &Path, metadata: Option<&str>) -> Result<usize> {
    let files = sorted_files(dir)?;
    let mut zip = ZipWriter::new(File::create(output)?);
    let mut written = 0;
    for path in &files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if name.eq_ignore_ascii_case(METADATA_ENTRY) {
            continue;
        }
        let size = fs::metadata(path)?.len();
        zip.start_file(name, options_for(size))?;
        io::copy(&mut File::open(path)?, &mut zip)?;
        written += 1;
    }
    if let Some(text) = metadata {
        zip.start_file(METADATA_ENTRY, options_for(text.len() as u64))?;
        zip.write_all(text.as_bytes())?;
    }
    zip.finish()?;
    debug!("wrote {} pages to {}", written, output.display());
    Ok(written)
}

pub fn entries(path: &Path) -> Result<Vec<EntryInfo>> {
    let mut archive = open(path)?;
    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let f = archive.by_index(i)?;
        if f.is_dir() {
            continue;
        }
        out.push(EntryInfo { index: i, name: f.name().to_string(), size: f.size() });
    }
    Ok(out)
}

/// Sum of the uncompressed sizes of all entries.
pub fn uncompressed_size(path: &Path) -> Result<u64> {
    Ok(entries(path)?.iter().map(|e| e.size).sum())
}

/// Copies the given entries of `source` into a new archive at `output`,
/// decompressing and deflating each one again.
pub fn copy_entries(source: &mut ZipArchive<File>, entries: &[EntryInfo], output: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(output)?);
    for e in entries {
        let mut f = source.by_index(e.index)?;
        zip.start_file(e.name.as_str(), options_for(e.size))?;
        io::copy(&mut f, &mut zip)?;
    }
    zip.finish()?;
    Ok(())
}

pub fn open(path: &Path) -> Result<ZipArchive<File>> {
    Ok(ZipArchive::new(File::open(path)?)?)
}

/// Extracts the pages of one chapter archive into `dest`, renaming each to
/// `<prefix>_<original name>`. The metadata entry is dropped.
pub fn extract_with_prefix(archive_path: &Path, dest: &Path, prefix: &str) -> Result<usize> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut count = 0;
    for i in 0..archive.len() {
        let mut f = archive.by_index(i)?;
        if f.is_dir() {
            continue;
        }
        let base = Path::new(f.name())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if base.is_empty() || base.eq_ignore_ascii_case(METADATA_ENTRY) {
            continue;
        }
        let mut out = File::create(dest.join(format!("{prefix}_{base}")))?;
        io::copy(&mut f, &mut out)?;
        count += 1;
    }
    Ok(count)
}

/// Merges per-chapter archives into `output`, in the order given. Each
/// archive is unpacked into its own scratch directory first.
pub fn merge_chapter_archives(
    chapters: &[(ArchiveChapter, PathBuf)],
    output: &Path,
    progress: &dyn ProgressSink,
) -> Result<usize> {
    let scratch = tempfile::tempdir()?;
    let mut zip = ZipWriter::new(File::create(output)?);
    let mut written = 0;
    progress.set_len(chapters.len() as u64);
    for (chapter, path) in chapters {
        let dir = scratch.path().join(crate::pathutil::file_stem(path));
        fs::create_dir_all(&dir)?;
        extract_with_prefix(path, &dir, &chapter.prefix())?;
        for file in sorted_files(&dir)? {
            let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let size = fs::metadata(&file)?.len();
            zip.start_file(name, options_for(size))?;
            io::copy(&mut File::open(&file)?, &mut zip)?;
            written += 1;
        }
        progress.inc(1);
    }
    zip.finish()?;
    progress.finish("combined".into());
    Ok(written)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::progress::NullProgress;
    use std::io::Read;

    #[test]
    fn write_dir_sorted_with_metadata_and_no_nested_archives() {
        let td = tempfile::tempdir().unwrap();
        let dir = td.path().join("pages");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("002.jpg"), b"b").unwrap();
        fs::write(dir.join("001.jpg"), b"a").unwrap();
        fs::write(dir.join("old.cbz"), b"zip").unwrap();
        let out = td.path().join("out.cbz");

        assert_eq!(write_dir(&dir, &out, Some("{\"title\":\"x\"}")).unwrap(), 2);
        assert_eq!(names(&out), vec!["001.jpg", "002.jpg", METADATA_ENTRY]);

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut text = String::new();
        archive.by_name(METADATA_ENTRY).unwrap().read_to_string(&mut text).unwrap();
        assert!(text.contains("title"));
    }

    #[test]
    fn size_is_uncompressed_sum() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("a.cbz");
        make_archive(&p, &[("a", &[0u8; 100][..]), ("b", &[1u8; 50][..])]);
        assert_eq!(uncompressed_size(&p).unwrap(), 150);
    }

    #[test]
    fn merge_prefixes_and_skips_metadata() {
        let td = tempfile::tempdir().unwrap();
        let c10 = td.path().join("Chapter_10.0.cbz");
        let c9 = td.path().join("Chapter_9.5.cbz");
        make_archive(&c10, &[("000.jpg", &b"x"[..]), (METADATA_ENTRY, &b"{}"[..])]);
        make_archive(&c9, &[("001.jpg", &b"y"[..]), ("000.jpg", &b"z"[..])]);
        let chapters = vec![
            (ArchiveChapter { main: 9, decimal: 5 }, c9),
            (ArchiveChapter { main: 10, decimal: 0 }, c10),
        ];
        let out = td.path().join("all.cbz");
        assert_eq!(merge_chapter_archives(&chapters, &out, &NullProgress).unwrap(), 3);
        assert_eq!(names(&out), vec!["0009.5_000.jpg", "0009.5_001.jpg", "0010.0_000.jpg"]);
    }
}
