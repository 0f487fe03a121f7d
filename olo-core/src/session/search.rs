// src/session/search.rs
//! Thin file-scan search over persisted session state.
//!
//! Two sweeps per query, both case-insensitive substring matches:
//! - every `*.stamp.json` under the base directory (recursive), returning
//!   the parsed stamp;
//! - every `*.html` under `<base>/dom-saves`, returning a bounded context
//!   excerpt around the first match with newlines flattened.
//!
//! Unreadable or unparseable files are skipped, not fatal.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::services::stamp::Stamp;

/// Default number of context characters on each side of a DOM match.
pub const DOM_CONTEXT_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub enum SearchHit {
    /// A persisted stamp whose JSON contains the query.
    Stamp { file: PathBuf, stamp: Stamp },
    /// A saved DOM capture containing the query, with a `…context…` excerpt.
    Dom { file: PathBuf, context: String },
}

/// Scan `base` for stamp files and `base/dom-saves` for HTML captures
/// matching `query`. `context_chars` bounds the DOM excerpt on each side.
pub fn search_sessions(base: &Path, query: &str, context_chars: usize) -> Result<Vec<SearchHit>> {
    let needle = query.to_lowercase();
    let mut out = Vec::new();

    for entry in WalkDir::new(base).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if !name.ends_with(".stamp.json") {
            continue;
        }
        let Ok(data) = fs::read_to_string(path) else { continue };
        if !data.to_lowercase().contains(&needle) {
            continue;
        }
        if let Ok(stamp) = serde_json::from_str::<Stamp>(&data) {
            out.push(SearchHit::Stamp {
                file: path.to_path_buf(),
                stamp,
            });
        }
    }

    let dom_dir = base.join("dom-saves");
    if dom_dir.is_dir() {
        for entry in fs::read_dir(&dom_dir)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else { continue };
            let lower = content.to_lowercase();
            let Some(idx) = lower.find(&needle) else { continue };
            out.push(SearchHit::Dom {
                context: excerpt_around(&content, idx, needle.len(), context_chars),
                file: path,
            });
        }
    }

    Ok(out)
}

/// `…60 chars|match|60 chars…` with newlines flattened to spaces.
fn excerpt_around(content: &str, match_at: usize, match_len: usize, context: usize) -> String {
    let start = floor_char_boundary(content, match_at.saturating_sub(context));
    let end = ceil_char_boundary(content, (match_at + match_len + context).min(content.len()));
    let ctx = content[start..end].replace('\n', " ");
    format!("...{ctx}...")
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
