use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

pub const STATS_FILE: &str = "download_stats.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterStats {
    pub chapter_number: String,
    pub title: String,
    /// Seconds.
    pub download_time: f64,
    pub bytes: u64,
    /// Bytes per second.
    pub speed: f64,
    pub pages: usize,
    pub scanlation_group: String,
}

/// Running totals for one manga download, kept on disk so a resumed run adds
/// to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStats {
    pub download_date: String,
    pub total_chapters: usize,
    #[serde(default)]
    pub chapters: Vec<ChapterStats>,
    #[serde(default)]
    pub total_download_time: f64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub average_speed: f64,
    #[serde(default)]
    pub scanlation_groups: BTreeSet<String>,
}

impl DownloadStats {
    pub fn new(total_chapters: usize) -> Self {
        Self {
            download_date: chrono::Local::now().to_rfc3339(),
            total_chapters,
            chapters: Vec::new(),
            total_download_time: 0.0,
            total_bytes: 0,
            average_speed: 0.0,
            scanlation_groups: BTreeSet::new(),
        }
    }

    /// Carries over totals, chapters and groups from an earlier run's file.
    /// An unreadable file is reported and ignored.
    pub fn resume_from(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        let previous = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<DownloadStats>(&s).map_err(anyhow::Error::from));
        match previous {
            Ok(prev) => {
                self.total_download_time = prev.total_download_time;
                self.total_bytes = prev.total_bytes;
                self.chapters = prev.chapters;
                self.scanlation_groups = prev.scanlation_groups;
            }
            Err(e) => warn!("Could not load existing download stats: {e}"),
        }
    }

    pub fn record(&mut self, chapter: ChapterStats) {
        self.total_download_time += chapter.download_time;
        self.total_bytes += chapter.bytes;
        self.scanlation_groups.insert(chapter.scanlation_group.clone());
        self.chapters.push(chapter);
    }

    pub fn finalize(&mut self) {
        if self.total_download_time > 0.0 {
            self.average_speed = self.total_bytes as f64 / self.total_download_time;
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
    }
}

pub fn speed(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes as f64 / secs } else { 0.0 }
}
