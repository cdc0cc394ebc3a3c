use std::env;
use std::path::{Path, PathBuf};

/// Cleans up a directory typed or pasted at a prompt: surrounding quotes,
/// a leading `~`, and shell-escaped spaces.
pub fn sanitize_path_input(raw: &str) -> PathBuf {
    let mut s = raw.trim();
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        s = &s[1..s.len() - 1];
    }
    let mut out = s.to_string();
    if let Some(rest) = s.strip_prefix('~') {
        let home = env::var(if cfg!(windows) { "USERPROFILE" } else { "HOME" }).unwrap_or_default();
        if !home.is_empty() && (rest.is_empty() || rest.starts_with(['/', '\\'])) {
            out = format!("{home}{rest}");
        }
    }
    if !cfg!(windows) {
        out = out.replace("\\ ", " ");
    }
    PathBuf::from(out)
}

/// Makes a manga title safe to use as a directory name.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') { '_' } else { c })
        .collect();
    replaced.trim_matches(|c| c == '.' || c == ' ').to_string()
}

pub fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("output")
}

pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Size in GiB for listings.
pub fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}
