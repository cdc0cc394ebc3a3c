use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of language code to text, as MangaDex returns titles and descriptions.
pub type Localized = BTreeMap<String, String>;

fn english_or_first(map: &Localized) -> Option<&str> {
    map.get("en").or_else(|| map.values().next()).map(String::as_str)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MangaRecord {
    pub id: String,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MangaAttributes {
    #[serde(default)]
    pub title: Localized,
    #[serde(default)]
    pub description: Localized,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    pub attributes: TagAttributes,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TagAttributes {
    #[serde(default)]
    pub name: Localized,
}

impl MangaRecord {
    pub fn title(&self) -> &str {
        english_or_first(&self.attributes.title).unwrap_or("")
    }

    /// Description cut to 70 characters for search listings.
    pub fn short_description(&self) -> String {
        let d = english_or_first(&self.attributes.description).unwrap_or("");
        if d.chars().count() > 70 {
            format!("{}...", d.chars().take(70).collect::<String>())
        } else {
            d.to_string()
        }
    }

    pub fn description(&self) -> String {
        self.attributes
            .description
            .get("en")
            .cloned()
            .unwrap_or_else(|| "No description.".to_string())
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.attributes
            .tags
            .iter()
            .filter_map(|t| t.attributes.name.get("en").cloned())
            .collect()
    }

    /// `(kind, id)` of every author and artist relationship.
    pub fn people(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relationships
            .iter()
            .filter(|r| r.kind == "author" || r.kind == "artist")
            .map(|r| (r.kind.as_str(), r.id.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub attributes: PersonAttributes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverAttributes {
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cover {
    pub attributes: CoverAttributes,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChapterRecord {
    pub id: String,
    pub attributes: ChapterAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub translated_language: Option<String>,
}

impl ChapterRecord {
    /// Chapter label; oneshots without a number count as chapter 0.
    pub fn label(&self) -> &str {
        self.attributes.chapter.as_deref().unwrap_or("0")
    }

    pub fn group_name(&self) -> String {
        self.relationships
            .iter()
            .find(|r| r.kind == "scanlation_group")
            .map(|r| {
                r.attributes
                    .as_ref()
                    .and_then(|a| a.get("name"))
                    .and_then(|n| n.as_str())
                    .unwrap_or("Unknown")
                    .to_string()
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn is_external(&self) -> bool {
        self.attributes.external_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtHome {
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtHomeChapter {
    pub hash: String,
    pub data: Vec<String>,
}

impl AtHome {
    pub fn page_urls(&self) -> impl Iterator<Item = (&str, String)> {
        self.chapter
            .data
            .iter()
            .map(|f| (f.as_str(), format!("{}/data/{}/{}", self.base_url, self.chapter.hash, f)))
    }
}

/// Flat metadata record kept next to the download and inside each chapter
/// archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaMetadata {
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub id: String,
}
