use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Numeric ordering key for a chapter, taken from a directory or file name.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ChapterKey(pub f64);

impl ChapterKey {
    /// Fixed-width form used as a file-name prefix, e.g. `0046`. Keys wider
    /// than `width` keep all their digits.
    pub fn padded(&self, width: usize) -> String {
        format!("{:0width$}", self.0.trunc() as u64)
    }
}

pub const MIN_KEY_WIDTH: usize = 4;

/// Prefix width that keeps every key of a run in numeric order when the
/// prefixes are compared as text.
pub fn key_width<I: IntoIterator<Item = ChapterKey>>(keys: I) -> usize {
    keys.into_iter()
        .map(|k| (k.0.trunc() as u64).to_string().len())
        .fold(MIN_KEY_WIDTH, usize::max)
}

enum Rule {
    Number,
    Floor,
    Extra,
}

fn rules() -> &'static [(Regex, Rule)] {
    static RULES: OnceLock<Vec<(Regex, Rule)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // "Ch.11", "Vol.04 Ch.019", "Ch.078.5"
            (r"[Cc]h\.\s*(\d+\.?\d*)", Rule::Number),
            // "Chapter 46"
            (r"[Cc]hapter\s+(\d+\.?\d*)", Rule::Number),
            (r"[Vv]ol\.\d+\s*[Cc]h\.\s*(\d+\.?\d*)", Rule::Number),
            // "Vol.5 Floor 41 The Swallowed-Up Voice"
            (r"[Vv]ol\.\s*(\d+)\s*[Ff]loor\s+(\d+)", Rule::Floor),
            // "Vol.5 Extra In The Loft" sorts as chapter zero of the next volume
            (r"[Vv]ol\.\s*(\d+)\s*[Ee]xtra", Rule::Extra),
        ]
        .into_iter()
        .map(|(pat, rule)| (Regex::new(pat).expect("static chapter pattern"), rule))
        .collect()
    })
}

/// Extracts the chapter key from a name. First matching rule wins.
pub fn extract_chapter_number(name: &str) -> Option<ChapterKey> {
    for (re, rule) in rules() {
        let Some(caps) = re.captures(name) else { continue };
        let key = match rule {
            Rule::Number => caps[1].trim_end_matches('.').parse::<f64>().ok()?,
            // volume digits followed by the floor padded to three: "Vol.1 Floor 1000" is 11000
            Rule::Floor => {
                let vol: u64 = caps[1].parse().ok()?;
                let floor: u64 = caps[2].parse().ok()?;
                format!("{vol}{floor:03}").parse::<f64>().ok()?
            }
            Rule::Extra => {
                let vol: u64 = caps[1].parse().ok()?;
                vol.checked_add(1)?.checked_mul(1000)? as f64
            }
        };
        return Some(ChapterKey(key));
    }
    None
}

/// Sort key for a name; unparseable names go last.
pub fn sort_key(name: &str) -> f64 {
    extract_chapter_number(name).map(|k| k.0).unwrap_or(f64::INFINITY)
}

pub fn compare_names(a: &str, b: &str) -> Ordering {
    sort_key(a).total_cmp(&sort_key(b))
}

/// Chapter number encoded in a per-chapter archive name such as `Chapter_12.5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveChapter {
    pub main: u32,
    pub decimal: u32,
}

impl ArchiveChapter {
    pub fn parse(stem: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"^Chapter_(\d+)(?:\.(\d+))?").expect("static archive pattern"));
        let caps = re.captures(stem)?;
        let main = caps[1].parse().ok()?;
        let decimal = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(Self { main, decimal })
    }

    /// Prefix for entries copied out of this chapter's archive.
    pub fn prefix(&self) -> String {
        format!("{:04}.{}", self.main, self.decimal)
    }
}

/// Label as the remote catalog reports it, rendered with one decimal so that
/// `"5"` and `"5.0"` compare equal.
pub fn normalize_label(label: &str) -> String {
    format!("{:.1}", label.trim().parse::<f64>().unwrap_or(0.0))
}

/// Base name of the per-chapter archive for a remote chapter label.
pub fn chapter_title(label: &str) -> String {
    format!("Chapter_{}", normalize_label(label))
}

/// Groups items by label, keeping labels in first-seen order.
pub fn group_versions<T, F>(items: Vec<T>, label: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> String,
{
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for item in items {
        let l = label(&item);
        match groups.iter_mut().find(|(g, _)| *g == l) {
            Some((_, versions)) => versions.push(item),
            None => groups.push((l, vec![item])),
        }
    }
    groups
}
