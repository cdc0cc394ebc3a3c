//! MangaDex catalog access.
//!
//! The download pipeline only talks to [`Catalog`]; [`MangaDexClient`] is the
//! HTTP implementation.

mod client;
pub mod models;

pub use client::MangaDexClient;
pub use models::{AtHome, ChapterRecord, MangaMetadata, MangaRecord};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("error connecting to MangaDex API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("MangaDex returned {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("error parsing response from MangaDex API: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("No manga found with title '{0}'")]
    NotFound(String),
    #[error("search cancelled by user")]
    Cancelled,
}

pub type Result<T, E = FetchError> = std::result::Result<T, E>;

/// Filters for one page of the chapter feed.
#[derive(Debug, Clone, Default)]
pub struct ChapterQuery<'a> {
    pub manga_id: &'a str,
    /// `None` lists every language.
    pub language: Option<&'a str>,
    pub include_groups: bool,
}

pub const CHAPTER_PAGE_SIZE: u32 = 100;

pub trait Catalog {
    /// Title search. `relaxed` also admits every content rating.
    fn search(&self, title: &str, relaxed: bool) -> Result<Vec<MangaRecord>>;
    /// Name of an author or artist.
    fn person(&self, kind: &str, id: &str) -> Result<String>;
    fn cover_file_name(&self, manga_id: &str) -> Result<Option<String>>;
    fn cover_url(&self, manga_id: &str, file_name: &str) -> String;
    /// One page of chapters, `CHAPTER_PAGE_SIZE` long, ordered by chapter.
    fn chapters(&self, query: &ChapterQuery<'_>, offset: u32) -> Result<models::Collection<ChapterRecord>>;
    fn at_home(&self, chapter_id: &str) -> Result<AtHome>;
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
