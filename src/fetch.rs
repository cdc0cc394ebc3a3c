use anyhow::{Context, Result};
use log::{error, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::archive;
use crate::chapter::{self, chapter_title, normalize_label};
use crate::cli::FetchArgs;
use crate::error::CbzError;
use crate::mangadex::{Catalog, MangaDexClient, ChapterQuery, ChapterRecord, FetchError, MangaMetadata, MangaRecord};
use crate::pathutil::sanitize_filename;
use crate::progress::{IndicatifProgress, NullProgress, ProgressSink};
use crate::prompt::{pick, yes_no, Escape, Prompt};
use crate::scan::{self, COMBINED_SUFFIX};
use crate::similarity;
use crate::stats::{self, ChapterStats, DownloadStats, STATS_FILE};

pub const METADATA_FILE: &str = "manga_metadata.json";
pub const COVER_FILE: &str = "cover.jpg";
const SHORTLIST_LEN: usize = 5;
const SIMILARITY_CUTOFF: f64 = 0.3;

/// Where a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Combined(PathBuf),
    NothingToDownload,
    Cancelled,
}

pub struct Options {
    pub downloads_dir: PathBuf,
    pub language: String,
    pub show_progress: bool,
}

impl From<&FetchArgs> for Options {
    fn from(args: &FetchArgs) -> Self {
        Self { downloads_dir: args.downloads_dir.clone(), language: args.language.clone(), show_progress: true }
    }
}

/// Entry point for `cbz-ops fetch`.
pub fn run(args: &FetchArgs, p: &mut dyn Prompt) -> Result<()> {
    let title = match &args.title {
        Some(t) => t.clone(),
        None => loop {
            let t = p.ask("Enter manga name: ")?;
            if !t.trim().is_empty() {
                break t.trim().to_string();
            }
        },
    };
    let client = MangaDexClient::new(&args.api_url, &args.uploads_url)?;
    let outcome = Fetcher::new(&client, p, Options::from(args)).run(&title)?;
    info!("fetch finished: {outcome:?}");
    Ok(())
}

/// Search results worth showing for `query`: the closest titles, or the
/// first few results when nothing is close. Each record appears once.
pub fn shortlist<'a>(query: &str, results: &'a [MangaRecord]) -> Vec<&'a MangaRecord> {
    let titles: Vec<String> = results.iter().map(|m| m.title().to_lowercase()).collect();
    let mut matches: Vec<&str> = similarity::close_matches(&query.to_lowercase(), &titles, SHORTLIST_LEN, SIMILARITY_CUTOFF);
    if matches.is_empty() {
        matches = titles.iter().take(SHORTLIST_LEN).map(String::as_str).collect();
    }
    let mut shown: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for m in matches {
        let hit = results
            .iter()
            .zip(&titles)
            .find(|(r, t)| t.as_str() == m && !shown.contains(r.id.as_str()));
        if let Some((r, _)) = hit {
            shown.insert(r.id.as_str());
            out.push(r);
        }
    }
    out
}

pub fn search_and_select(catalog: &dyn Catalog, p: &mut dyn Prompt, title: &str) -> Result<MangaRecord> {
    let mut results = catalog.search(title, false)?;
    if results.is_empty() {
        info!("no results for '{title}', retrying with every content rating");
        results = catalog.search(title, true)?;
    }
    if results.is_empty() {
        return Err(FetchError::NotFound(title.to_string()).into());
    }
    let shown = shortlist(title, &results);
    p.say("\nSearch results:");
    for (i, m) in shown.iter().enumerate() {
        p.say(&format!("{}. {} - {}", i + 1, m.title(), m.short_description()));
    }
    let question = "\nEnter the number of the manga you want to download (or 'q' to quit): ";
    match pick(p, question, shown.len(), Escape::Key('q'))? {
        Some(i) => Ok(shown[i].clone()),
        None => Err(FetchError::Cancelled.into()),
    }
}

/// Metadata for the chosen record. People that fail to resolve are skipped.
pub fn resolve_metadata(catalog: &dyn Catalog, manga: &MangaRecord) -> MangaMetadata {
    let mut authors = Vec::new();
    for (kind, id) in manga.people() {
        match catalog.person(kind, id) {
            Ok(name) => authors.push(name),
            Err(e) => warn!("Could not fetch {kind} information: {e}"),
        }
    }
    MangaMetadata {
        title: manga.title().to_string(),
        description: manga.description(),
        authors,
        tags: manga.tag_names(),
        id: manga.id.clone(),
    }
}

/// Saves the first cover as `cover.jpg` unless one is already there.
pub fn download_cover(catalog: &dyn Catalog, manga_id: &str, folder: &Path) -> Option<PathBuf> {
    let path = folder.join(COVER_FILE);
    if path.exists() {
        return None;
    }
    let fetched = catalog
        .cover_file_name(manga_id)
        .and_then(|name| name.map(|n| catalog.fetch_bytes(&catalog.cover_url(manga_id, &n))).transpose());
    match fetched {
        Ok(Some(bytes)) => match fs::write(&path, bytes) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("could not save cover: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("could not fetch cover: {e}");
            None
        }
    }
}

/// Every chapter of a manga, paging through the feed until `total` is reached.
pub fn list_chapters(catalog: &dyn Catalog, query: &ChapterQuery<'_>) -> Result<Vec<ChapterRecord>> {
    let mut chapters = Vec::new();
    let mut offset = 0;
    loop {
        let page = catalog.chapters(query, offset)?;
        let got = page.data.len();
        chapters.extend(page.data);
        if chapters.len() >= page.total as usize || got == 0 {
            break;
        }
        offset += got as u32;
    }
    Ok(chapters)
}

/// Labels that exist in some language but not in `language`, numerically sorted.
pub fn missing_in_language(catalog: &dyn Catalog, manga_id: &str, language: &str) -> Result<Vec<String>> {
    let translated = list_chapters(catalog, &ChapterQuery { manga_id, language: Some(language), include_groups: false })?;
    let all = list_chapters(catalog, &ChapterQuery { manga_id, language: None, include_groups: false })?;
    let have: BTreeSet<&str> = translated.iter().map(ChapterRecord::label).collect();
    let mut missing: Vec<String> = all
        .iter()
        .map(ChapterRecord::label)
        .filter(|l| !have.contains(l))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    missing.sort_by(|a, b| {
        let (x, y) = (a.parse::<f64>().unwrap_or(f64::INFINITY), b.parse::<f64>().unwrap_or(f64::INFINITY));
        x.total_cmp(&y).then_with(|| a.cmp(b))
    });
    Ok(missing)
}

/// Keeps one version per chapter label, asking the user where the choice is
/// not obvious.
pub fn select_versions(p: &mut dyn Prompt, chapters: Vec<ChapterRecord>) -> Result<Vec<ChapterRecord>> {
    let chapters: Vec<ChapterRecord> = chapters.into_iter().filter(|c| !c.is_external()).collect();
    let grouped = chapter::group_versions(chapters, |c| c.label().to_string());

    let groups: Vec<String> = grouped
        .iter()
        .flat_map(|(_, versions)| versions.iter().map(ChapterRecord::group_name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut preferred = None;
    if groups.len() > 1 {
        p.say("\nMultiple scanlation groups found:");
        for (i, g) in groups.iter().enumerate() {
            p.say(&format!("{}. {}", i + 1, g));
        }
        let question = "\nEnter the number of your preferred scanlation group (or press Enter to choose per chapter): ";
        if let Some(i) = pick(p, question, groups.len(), Escape::Empty)? {
            p.say(&format!("Selected group: {}", groups[i]));
            preferred = Some(groups[i].clone());
        }
    }

    let mut selected = Vec::new();
    for (label, mut versions) in grouped {
        if versions.len() == 1 {
            selected.append(&mut versions);
            continue;
        }
        if let Some(pref) = &preferred {
            if let Some(pos) = versions.iter().position(|v| &v.group_name() == pref) {
                selected.push(versions.swap_remove(pos));
                continue;
            }
        }
        p.say(&format!("\nMultiple versions found for Chapter {label}:"));
        for (i, v) in versions.iter().enumerate() {
            p.say(&format!("{}. Group: {}", i + 1, v.group_name()));
            p.say(&format!("   Pages: {}", v.attributes.pages));
            p.say(&format!("   Uploaded: {}", v.attributes.created_at));
            p.say(&format!("   Version: {}", v.attributes.version.unwrap_or(1)));
        }
        let question = format!("\nSelect version for Chapter {label} (1-{}, or 's' to skip): ", versions.len());
        match pick(p, &question, versions.len(), Escape::Key('s'))? {
            Some(i) => selected.push(versions.swap_remove(i)),
            None => p.say(&format!("Skipping Chapter {label}")),
        }
    }
    Ok(selected)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterDownload {
    pub pages: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Fetches every page of a chapter, in order, into `dir` as `000.<ext>`,
/// `001.<ext>`, ... Any failure aborts the chapter.
pub fn download_chapter(
    catalog: &dyn Catalog,
    chapter_id: &str,
    dir: &Path,
    progress: &dyn ProgressSink,
) -> Result<ChapterDownload> {
    let start = Instant::now();
    let at_home = catalog.at_home(chapter_id)?;
    progress.set_len(at_home.chapter.data.len() as u64);
    let mut bytes = 0u64;
    for (i, (file, url)) in at_home.page_urls().enumerate() {
        let data = catalog.fetch_bytes(&url)?;
        bytes += data.len() as u64;
        let ext = Path::new(file).extension().and_then(|e| e.to_str()).unwrap_or("jpg");
        fs::write(dir.join(format!("{i:03}.{ext}")), &data)?;
        progress.inc(1);
    }
    progress.finish("done".into());
    Ok(ChapterDownload { pages: at_home.chapter.data.len(), bytes, elapsed: start.elapsed() })
}

pub struct Fetcher<'a> {
    catalog: &'a dyn Catalog,
    prompt: &'a mut dyn Prompt,
    opts: Options,
}

impl<'a> Fetcher<'a> {
    pub fn new(catalog: &'a dyn Catalog, prompt: &'a mut dyn Prompt, opts: Options) -> Self {
        Self { catalog, prompt, opts }
    }

    fn progress(&self, len: u64, prefix: String) -> Box<dyn ProgressSink> {
        if self.opts.show_progress {
            Box::new(IndicatifProgress::new(len, prefix))
        } else {
            Box::new(NullProgress)
        }
    }

    /// Full run for one title. A failure after the manga folder exists removes
    /// the folder before the error is returned.
    pub fn run(&mut self, title: &str) -> Result<Outcome> {
        let manga = search_and_select(self.catalog, self.prompt, title)?;
        let metadata = resolve_metadata(self.catalog, &manga);

        fs::create_dir_all(&self.opts.downloads_dir)
            .with_context(|| format!("cannot create {}", self.opts.downloads_dir.display()))?;
        let safe_title = sanitize_filename(&metadata.title);
        let folder = self.opts.downloads_dir.join(&safe_title);
        fs::create_dir_all(&folder).with_context(|| format!("cannot create {}", folder.display()))?;

        match self.download_into(&folder, &safe_title, &metadata) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.prompt.say(&format!("\nAn error occurred during download: {e:#}"));
                self.prompt.say("Cleaning up download folder...");
                match fs::remove_dir_all(&folder) {
                    Ok(()) => info!("removed download folder {}", folder.display()),
                    Err(cleanup) => error!("Error during cleanup of {}: {cleanup}", folder.display()),
                }
                Err(e)
            }
        }
    }

    /// Asks how to treat chapters left by an earlier run. `None` means quit.
    fn resume_choice(&mut self, folder: &Path) -> Result<Option<BTreeSet<String>>> {
        let downloaded = scan::downloaded_labels(folder)?;
        if downloaded.is_empty() {
            return Ok(Some(downloaded));
        }
        self.prompt.say(&format!("\nFound {} previously downloaded chapters:", downloaded.len()));
        for label in &downloaded {
            self.prompt.say(&format!("  • Chapter {label}"));
        }
        let question = "\nWould you like to:\n1. Resume download (skip existing chapters)\n2. Start fresh (delete existing chapters)\n3. Quit\nEnter your choice (1-3): ";
        match pick(self.prompt, question, 3, Escape::None)? {
            Some(0) => Ok(Some(downloaded)),
            Some(1) => {
                scan::remove_chapter_archives(folder)?;
                Ok(Some(BTreeSet::new()))
            }
            _ => Ok(None),
        }
    }

    fn download_into(&mut self, folder: &Path, safe_title: &str, metadata: &MangaMetadata) -> Result<Outcome> {
        let Some(downloaded) = self.resume_choice(folder)? else {
            self.prompt.say("\nDownload cancelled by user.");
            return Ok(Outcome::Cancelled);
        };

        let metadata_json = serde_json::to_string_pretty(metadata)?;
        fs::write(folder.join(METADATA_FILE), &metadata_json)?;
        if let Some(cover) = download_cover(self.catalog, &metadata.id, folder) {
            self.prompt.say(&format!("Saved cover to {}", cover.display()));
        }

        let language = self.opts.language.clone();
        let missing = missing_in_language(self.catalog, &metadata.id, &language)?;
        if !missing.is_empty() {
            self.prompt.say(&format!("\nNote: The following chapters are not available in {language}:"));
            for label in &missing {
                self.prompt.say(&format!("  • Chapter {label}"));
            }
            self.prompt.say("\nThis is normal for some series where certain chapters:");
            self.prompt.say("  • May be split into subchapters (e.g., 356.1, 356.2 instead of 356)");
            self.prompt.say(&format!("  • May be available in other languages but not in {language}"));
            self.prompt.say("  • May be special chapters or extras");
            let question = format!("\nSome chapters are not available in {language}. Would you like to continue anyway? (y/n): ");
            if !yes_no(self.prompt, &question, None)? {
                self.prompt.say("\nDownload cancelled by user.");
                return Ok(Outcome::Cancelled);
            }
        }

        let query = ChapterQuery { manga_id: &metadata.id, language: Some(&language), include_groups: true };
        let chapters = select_versions(self.prompt, list_chapters(self.catalog, &query)?)?;
        if chapters.is_empty() {
            self.prompt.say("No chapters found to download.");
            return Ok(Outcome::NothingToDownload);
        }

        let stats_path = folder.join(STATS_FILE);
        let mut stats = DownloadStats::new(chapters.len());
        stats.resume_from(&stats_path);

        let total = chapters.len();
        for (i, ch) in chapters.iter().enumerate() {
            self.prompt.clear();
            self.prompt.say(&format!("\nManga: {}", metadata.title));
            self.prompt.say("--------------------------------");
            let label = ch.label();
            let title = chapter_title(label);
            if downloaded.contains(&normalize_label(label)) {
                self.prompt.say(&format!("Skipping {title} (already downloaded)"));
                continue;
            }
            self.prompt.say(&format!("Processing {title} ({}/{total})", i + 1));

            let record = self
                .fetch_chapter(ch, &title, folder, &metadata_json)
                .with_context(|| format!("Failed to process {title}"))?;
            stats.record(record);
            stats.save(&stats_path)?;
        }

        stats.finalize();
        stats.save(&stats_path)?;

        self.prompt.say("\nCombining all chapters into a single CBZ file...");
        let combined = folder.join(format!("{safe_title}{COMBINED_SUFFIX}"));
        let archives = scan::chapter_archives(folder)?;
        if archives.is_empty() {
            return Err(CbzError::NoArchives(folder.to_path_buf()).into());
        }
        self.prompt.say(&format!("\nFound {} chapters to combine", archives.len()));
        let progress = self.progress(archives.len() as u64, "Combining chapters".to_string());
        archive::merge_chapter_archives(&archives, &combined, progress.as_ref())
            .with_context(|| format!("cannot write {}", combined.display()))?;
        scan::remove_chapter_archives(folder)?;

        self.prompt.say("\nDone! Combined CBZ file created successfully.");
        Ok(Outcome::Combined(combined))
    }

    /// Downloads one chapter into `<folder>/<title>.cbz`.
    fn fetch_chapter(&self, ch: &ChapterRecord, title: &str, folder: &Path, metadata_json: &str) -> Result<ChapterStats> {
        let scratch = tempfile::Builder::new().prefix(&format!("{title}.")).tempdir_in(folder)?;
        let progress = self.progress(u64::from(ch.attributes.pages), format!("Chapter {}", ch.label()));
        let dl = download_chapter(self.catalog, &ch.id, scratch.path(), progress.as_ref())?;
        archive::write_dir(scratch.path(), &folder.join(format!("{title}.cbz")), Some(metadata_json))?;
        info!("{title}: {} pages, {} bytes in {:.1}s", dl.pages, dl.bytes, dl.elapsed.as_secs_f64());
        Ok(ChapterStats {
            chapter_number: ch.label().to_string(),
            title: title.to_string(),
            download_time: dl.elapsed.as_secs_f64(),
            bytes: dl.bytes,
            speed: stats::speed(dl.bytes, dl.elapsed),
            pages: dl.pages,
            scanlation_group: ch.group_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::{make_archive, names};
    use crate::mangadex::models::{AtHomeChapter, Collection};
    use crate::mangadex::{self, AtHome};
    use crate::progress::testing::CountingProgress;
    use crate::prompt::Scripted;
    use serde_json::json;
    use std::cell::RefCell;
    use tempfile::tempdir;

    fn manga(id: &str, title: &str) -> MangaRecord {
        serde_json::from_value(json!({
            "id": id,
            "attributes": {"title": {"en": title}, "description": {"en": "desc"}, "tags": []},
            "relationships": [{"id": "p1", "type": "author"}, {"id": "p2", "type": "artist"}]
        }))
        .unwrap()
    }

    fn chapter(id: &str, label: &str, group: &str, lang: &str) -> ChapterRecord {
        serde_json::from_value(json!({
            "id": id,
            "attributes": {"chapter": label, "pages": 2, "createdAt": "2024-01-01", "translatedLanguage": lang},
            "relationships": [{"id": group, "type": "scanlation_group", "attributes": {"name": group}}]
        }))
        .unwrap()
    }

    /// In-memory catalog. Page URLs containing `fail_on` error out.
    #[derive(Default)]
    struct FakeCatalog {
        results: Vec<MangaRecord>,
        relaxed_only: bool,
        chapters: Vec<ChapterRecord>,
        fail_on: Option<String>,
        page_size: usize,
        at_home_calls: RefCell<Vec<String>>,
        chapter_calls: RefCell<u32>,
    }

    impl Catalog for FakeCatalog {
        fn search(&self, _title: &str, relaxed: bool) -> mangadex::Result<Vec<MangaRecord>> {
            if self.relaxed_only && !relaxed {
                return Ok(vec![]);
            }
            Ok(self.results.clone())
        }

        fn person(&self, kind: &str, id: &str) -> mangadex::Result<String> {
            if kind == "artist" {
                return Err(FetchError::Status { url: id.into(), status: 404 });
            }
            Ok(format!("{kind}-{id}"))
        }

        fn cover_file_name(&self, _manga_id: &str) -> mangadex::Result<Option<String>> {
            Ok(Some("c.jpg".into()))
        }

        fn cover_url(&self, manga_id: &str, file_name: &str) -> String {
            format!("cover://{manga_id}/{file_name}")
        }

        fn chapters(&self, q: &ChapterQuery<'_>, offset: u32) -> mangadex::Result<Collection<ChapterRecord>> {
            *self.chapter_calls.borrow_mut() += 1;
            let all: Vec<ChapterRecord> = self
                .chapters
                .iter()
                .filter(|c| q.language.map_or(true, |l| c.attributes.translated_language.as_deref() == Some(l)))
                .cloned()
                .collect();
            let size = if self.page_size == 0 { all.len().max(1) } else { self.page_size };
            let data = all.iter().skip(offset as usize).take(size).cloned().collect();
            Ok(Collection { data, total: all.len() as u32 })
        }

        fn at_home(&self, chapter_id: &str) -> mangadex::Result<AtHome> {
            self.at_home_calls.borrow_mut().push(chapter_id.to_string());
            Ok(AtHome {
                base_url: "https://node".into(),
                chapter: AtHomeChapter { hash: chapter_id.into(), data: vec!["a.png".into(), "b.jpg".into()] },
            })
        }

        fn fetch_bytes(&self, url: &str) -> mangadex::Result<Vec<u8>> {
            if let Some(f) = &self.fail_on {
                if url.contains(f.as_str()) {
                    return Err(FetchError::Status { url: url.into(), status: 500 });
                }
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn opts(dir: &Path) -> Options {
        Options { downloads_dir: dir.to_path_buf(), language: "en".into(), show_progress: false }
    }

    #[test]
    fn shortlist_prefers_close_titles_and_dedups() {
        let results = vec![manga("1", "Berserk"), manga("2", "Berserk"), manga("3", "Naruto")];
        let s = shortlist("berserk", &results);
        let ids: Vec<&str> = s.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let s = shortlist("qqqqqq", &results);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn search_falls_back_to_relaxed_rating() {
        let cat = FakeCatalog { results: vec![manga("1", "Berserk")], relaxed_only: true, ..Default::default() };
        let mut p = Scripted::new(["1"]);
        let m = search_and_select(&cat, &mut p, "Berserk").unwrap();
        assert_eq!(m.id, "1");
        assert!(p.said("1. Berserk - desc"));
    }

    #[test]
    fn search_without_results_is_not_found() {
        let cat = FakeCatalog::default();
        let mut p = Scripted::default();
        let err = search_and_select(&cat, &mut p, "Nothing").unwrap_err();
        assert!(matches!(err.downcast_ref::<FetchError>(), Some(FetchError::NotFound(_))));
    }

    #[test]
    fn failed_person_lookup_is_skipped() {
        let cat = FakeCatalog::default();
        let md = resolve_metadata(&cat, &manga("m", "Title"));
        assert_eq!(md.authors, vec!["author-p1"]);
        assert_eq!(md.description, "desc");
    }

    #[test]
    fn chapter_listing_follows_offsets() {
        let chapters = (1..=5).map(|n| chapter(&format!("c{n}"), &n.to_string(), "G", "en")).collect();
        let cat = FakeCatalog { chapters, page_size: 2, ..Default::default() };
        let q = ChapterQuery { manga_id: "m", language: Some("en"), include_groups: true };
        let got = list_chapters(&cat, &q).unwrap();
        let ids: Vec<&str> = got.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4", "c5"]);
        assert_eq!(*cat.chapter_calls.borrow(), 3);
    }

    #[test]
    fn missing_chapters_are_reported_in_numeric_order() {
        let cat = FakeCatalog {
            chapters: vec![
                chapter("a", "1", "G", "en"),
                chapter("b", "10", "G", "fr"),
                chapter("c", "2", "G", "fr"),
                chapter("d", "1", "G", "fr"),
            ],
            ..Default::default()
        };
        assert_eq!(missing_in_language(&cat, "m", "en").unwrap(), vec!["2", "10"]);
    }

    #[test]
    fn version_selection() {
        let chapters = vec![
            chapter("1a", "1", "Alpha", "en"),
            chapter("1b", "1", "Beta", "en"),
            chapter("2b", "2", "Beta", "en"),
            chapter("3c", "3", "Gamma", "en"),
            chapter("3d", "3", "Delta", "en"),
            chapter("4c", "4", "Gamma", "en"),
            chapter("4d", "4", "Delta", "en"),
        ];
        // prefer Beta (2nd of Alpha, Beta, Delta, Gamma); chapter 3 pick 2nd; chapter 4 skip
        let mut p = Scripted::new(["2", "2", "s"]);
        let picked = select_versions(&mut p, chapters).unwrap();
        let ids: Vec<&str> = picked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1b", "2b", "3d"]);
        assert!(p.said("Selected group: Beta"));
        assert!(p.said("Skipping Chapter 4"));
    }

    #[test]
    fn external_chapters_are_dropped() {
        let mut ext = chapter("x", "1", "G", "en");
        ext.attributes.external_url = Some("https://elsewhere".into());
        let mut p = Scripted::default();
        let picked = select_versions(&mut p, vec![ext, chapter("y", "2", "G", "en")]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "y");
    }

    #[test]
    fn chapter_pages_are_numbered_and_reported() {
        let td = tempdir().unwrap();
        let cat = FakeCatalog::default();
        let progress = CountingProgress::default();
        let dl = download_chapter(&cat, "ch", td.path(), &progress).unwrap();
        assert_eq!(dl.pages, 2);
        assert_eq!(progress.count.get(), 2);
        assert_eq!(fs::read(td.path().join("000.png")).unwrap(), b"https://node/data/ch/a.png");
        assert!(td.path().join("001.jpg").exists());
        assert_eq!(dl.bytes, ("https://node/data/ch/a.png".len() + "https://node/data/ch/b.jpg".len()) as u64);
    }

    #[test]
    fn resume_skips_existing_chapters() {
        let td = tempdir().unwrap();
        let folder = td.path().join("Berserk");
        fs::create_dir_all(&folder).unwrap();
        make_archive(&folder.join("Chapter_5.0.cbz"), &[("000.jpg", &b"five"[..])]);
        make_archive(&folder.join("Chapter_6.0.cbz"), &[("000.jpg", &b"six"[..])]);

        let cat = FakeCatalog {
            results: vec![manga("m", "Berserk")],
            chapters: vec![chapter("c5", "5", "G", "en"), chapter("c6", "6", "G", "en"), chapter("c7", "7", "G", "en")],
            ..Default::default()
        };
        // pick the manga, then resume
        let mut p = Scripted::new(["1", "1"]);
        let outcome = Fetcher::new(&cat, &mut p, opts(td.path())).run("Berserk").unwrap();

        assert_eq!(*cat.at_home_calls.borrow(), vec!["c7".to_string()]);
        let combined = folder.join("Berserk_combined.cbz");
        assert_eq!(outcome, Outcome::Combined(combined.clone()));
        assert_eq!(
            names(&combined),
            vec!["0005.0_000.jpg", "0006.0_000.jpg", "0007.0_000.png", "0007.0_001.jpg"]
        );
        assert!(!folder.join("Chapter_7.0.cbz").exists());
        assert!(folder.join(METADATA_FILE).exists());
        assert!(folder.join(COVER_FILE).exists());
        let stats: DownloadStats = serde_json::from_str(&fs::read_to_string(folder.join(STATS_FILE)).unwrap()).unwrap();
        assert_eq!(stats.chapters.len(), 1);
        assert!(stats.scanlation_groups.contains("G"));
    }

    #[test]
    fn mid_chapter_failure_removes_manga_folder() {
        let td = tempdir().unwrap();
        let cat = FakeCatalog {
            results: vec![manga("m", "Vinland Saga")],
            chapters: vec![chapter("c1", "1", "G", "en"), chapter("c2", "2", "G", "en")],
            fail_on: Some("/c2/b.jpg".into()),
            ..Default::default()
        };
        let mut p = Scripted::new(["1"]);
        let err = Fetcher::new(&cat, &mut p, opts(td.path())).run("Vinland").unwrap_err();
        assert!(format!("{err:#}").contains("Failed to process Chapter_2.0"));
        assert!(!td.path().join("Vinland Saga").exists());
        assert!(p.said("Cleaning up download folder"));
    }

    #[test]
    fn declining_missing_chapters_keeps_folder() {
        let td = tempdir().unwrap();
        let cat = FakeCatalog {
            results: vec![manga("m", "Title")],
            chapters: vec![chapter("c1", "1", "G", "en"), chapter("c2", "2", "G", "fr")],
            ..Default::default()
        };
        let mut p = Scripted::new(["1", "n"]);
        let outcome = Fetcher::new(&cat, &mut p, opts(td.path())).run("Title").unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(p.said("  • Chapter 2"));
        assert!(cat.at_home_calls.borrow().is_empty());
        assert!(td.path().join("Title").join(METADATA_FILE).exists());
    }

    #[test]
    fn start_fresh_deletes_previous_chapters() {
        let td = tempdir().unwrap();
        let folder = td.path().join("Title");
        fs::create_dir_all(&folder).unwrap();
        make_archive(&folder.join("Chapter_1.0.cbz"), &[("000.jpg", &b"old"[..])]);
        let cat = FakeCatalog {
            results: vec![manga("m", "Title")],
            chapters: vec![chapter("c1", "1", "G", "en")],
            ..Default::default()
        };
        let mut p = Scripted::new(["1", "2"]);
        Fetcher::new(&cat, &mut p, opts(td.path())).run("Title").unwrap();
        assert_eq!(*cat.at_home_calls.borrow(), vec!["c1".to_string()]);
    }
}
