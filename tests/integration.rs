use assert_cmd::Command;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn cbz_ops() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("cbz-ops"))
}

fn create_chapter(manga: &Path, dir: &str, pages: &[&str]) {
    let ch = manga.join(dir);
    fs::create_dir_all(&ch).unwrap();
    for p in pages {
        fs::write(ch.join(p), p.as_bytes()).unwrap();
    }
}

/// Stored (uncompressed) archive with `n` pages of `size` bytes each.
fn create_cbz(dir: &Path, name: &str, n: usize, size: usize) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for i in 0..n {
        zip.start_file(format!("{i:04}.0_{i:03}.jpg"), opts).unwrap();
        zip.write_all(&vec![i as u8; size]).unwrap();
    }
    zip.finish().unwrap();
    path
}

fn entry_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect::<Vec<_>>()
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

#[test]
fn combine_orders_chapters_numerically() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let manga = root.join("Series");
    create_chapter(&manga, "Ch.10", &["b.png", "a.jpg"]);
    create_chapter(&manga, "Ch.9", &["x.webp"]);
    create_chapter(&manga, "Vol.1 Extra", &["e.jpg", "readme.txt"]);

    // default dir, manga 1, no more
    let out = cbz_ops()
        .args(["combine", "-s"])
        .arg(root)
        .write_stdin("\n1\nn\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    assert!(stdout.contains("Successfully created combined CBZ file: Series_combined.cbz"));

    let combined = root.join("Series_combined.cbz");
    assert_eq!(
        sorted(entry_names(&combined)),
        vec!["0009_001.webp", "0010_001.jpg", "0010_002.png", "2000_001.jpg"]
    );
}

#[test]
fn combine_marks_already_combined_manga() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    create_chapter(&root.join("Done"), "Chapter 1", &["p.jpg"]);
    fs::write(root.join("Done_combined.cbz"), b"old").unwrap();

    let out = cbz_ops()
        .args(["combine", "-s"])
        .arg(root)
        .write_stdin("y\n1\nn\nq\nn\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    assert!(stdout.contains("1. Done [Already Combined]"));
    assert_eq!(fs::read(root.join("Done_combined.cbz")).unwrap(), b"old");
}

#[test]
fn combine_with_missing_source_fails() {
    let dir = tempdir().unwrap();
    cbz_ops()
        .args(["combine", "-s"])
        .arg(dir.path().join("nope"))
        .write_stdin("\n")
        .assert()
        .failure();
}

#[test]
fn split_into_bounded_parts() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let input = create_cbz(root, "Big_combined.cbz", 5, 1024);
    let out_dir = root.join("parts");

    // 2.5 KiB per part: two pages fit, a third does not
    let max_gb = 2560.0 / (1024.0 * 1024.0 * 1024.0);
    cbz_ops()
        .args(["split", "-i"])
        .arg(&input)
        .args(["-o"])
        .arg(&out_dir)
        .args(["-m", &format!("{max_gb}")])
        .assert()
        .success();

    let parts: Vec<Vec<String>> = (1..=3)
        .map(|i| entry_names(&out_dir.join(format!("Big_combined_part{i}.cbz"))))
        .collect();
    assert_eq!(parts[0], vec!["0000.0_000.jpg", "0001.0_001.jpg"]);
    assert_eq!(parts[1], vec!["0002.0_002.jpg", "0003.0_003.jpg"]);
    assert_eq!(parts[2], vec!["0004.0_004.jpg"]);
    assert!(!out_dir.join("Big_combined_part4.cbz").exists());
}

#[test]
fn split_small_archive_is_left_alone() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let input = create_cbz(root, "Small.cbz", 2, 16);
    let out_dir = root.join("parts");

    let out = cbz_ops()
        .args(["split", "-i"])
        .arg(&input)
        .args(["-o"])
        .arg(&out_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&out).contains("No splitting needed"));
    let produced = fs::read_dir(&out_dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(produced, 0);
}

#[test]
fn split_picks_from_downloads_dir() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let downloads = root.join("downloads");
    fs::create_dir_all(downloads.join("A")).unwrap();
    create_cbz(&downloads.join("A"), "A_combined.cbz", 3, 1024);
    let out_dir = root.join("parts");

    let max_gb = 1500.0 / (1024.0 * 1024.0 * 1024.0);
    let out = cbz_ops()
        .args(["split", "--downloads-dir"])
        .arg(&downloads)
        .args(["-o"])
        .arg(&out_dir)
        .args(["-m", &format!("{max_gb}")])
        .write_stdin("1\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    assert!(stdout.contains("Available manga files:"));
    assert!(stdout.contains("Split complete! Created 3 files:"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    cbz_ops().arg("merge").assert().failure();
}
