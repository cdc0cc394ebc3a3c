use log::{debug, info};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use super::models::{AtHome, ChapterRecord, Collection, Cover, Entity, MangaRecord, Person};
use super::{Catalog, ChapterQuery, FetchError, Result, CHAPTER_PAGE_SIZE};

const CONTENT_RATINGS: &[&str] = &["safe", "suggestive", "erotica", "pornographic"];
const SEARCH_LIMIT: &str = "100";

pub struct MangaDexClient {
    http: Client,
    api: String,
    uploads: String,
}

impl MangaDexClient {
    pub fn new(api: impl Into<String>, uploads: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api: api.into().trim_end_matches('/').to_string(),
            uploads: uploads.into().trim_end_matches('/').to_string(),
        })
    }

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        debug!("GET {url} {query:?}");
        let resp = self.http.get(url).query(query).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(resp.text()?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let text = self.get_text(&format!("{}{}", self.api, path), query)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Catalog for MangaDexClient {
    fn search(&self, title: &str, relaxed: bool) -> Result<Vec<MangaRecord>> {
        let mut query = vec![
            ("title", title.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("order[relevance]", "desc".to_string()),
        ];
        if relaxed {
            query.extend(CONTENT_RATINGS.iter().map(|r| ("contentRating[]", r.to_string())));
        }
        let text = self.get_text(&format!("{}/manga", self.api), &query)?;
        let debug_file = std::env::temp_dir().join("mangadex_search_debug.json");
        if std::fs::write(&debug_file, &text).is_ok() {
            debug!("search results saved to {}", debug_file.display());
        }
        let results: Collection<MangaRecord> = serde_json::from_str(&text)?;
        info!("search '{title}' (relaxed: {relaxed}) returned {} results", results.data.len());
        Ok(results.data)
    }

    fn person(&self, kind: &str, id: &str) -> Result<String> {
        let p: Entity<Person> = self.get_json(&format!("/{kind}/{id}"), &[])?;
        Ok(p.data.attributes.name)
    }

    fn cover_file_name(&self, manga_id: &str) -> Result<Option<String>> {
        let covers: Collection<Cover> = self.get_json("/cover", &[("manga[]", manga_id.to_string())])?;
        Ok(covers.data.into_iter().next().map(|c| c.attributes.file_name))
    }

    fn cover_url(&self, manga_id: &str, file_name: &str) -> String {
        format!("{}/covers/{}/{}", self.uploads, manga_id, file_name)
    }

    fn chapters(&self, q: &ChapterQuery<'_>, offset: u32) -> Result<Collection<ChapterRecord>> {
        let mut query = vec![
            ("manga", q.manga_id.to_string()),
            ("limit", CHAPTER_PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
            ("order[chapter]", "asc".to_string()),
        ];
        if let Some(lang) = q.language {
            query.push(("translatedLanguage[]", lang.to_string()));
        }
        if q.include_groups {
            query.push(("includes[]", "scanlation_group".to_string()));
        }
        self.get_json("/chapter", &query)
    }

    fn at_home(&self, chapter_id: &str) -> Result<AtHome> {
        self.get_json(&format!("/at-home/server/{chapter_id}"), &[])
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {url}");
        let resp = self.http.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        Ok(resp.bytes()?.to_vec())
    }
}
