// src/utils/logbook.rs
//! Append-only JSONL trail of session operations, one line per event.
//! The aggregate file lives at `<base>/logbook.jsonl`.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::{fs, io::Write, path::Path};

/// Collected-content events carry a clipped preview instead of the full
/// payload, so the logbook stays scannable.
const PREVIEW_CHARS: usize = 120;

#[derive(Serialize)]
struct ContentLine<'a> {
    artifact: &'a str,
    ts: &'a str,
    event: &'a str,
    content_preview: String,
}

/// Append a content-bearing event (artifact collection) with a short
/// preview of the payload.
pub fn append_log(base: &Path, artifact_id: &str, ts_rfc3339: &str, event: &str, content: &str) -> Result<()> {
    let line = ContentLine {
        artifact: artifact_id,
        ts: ts_rfc3339,
        event,
        content_preview: content.chars().take(PREVIEW_CHARS).collect(),
    };
    append_line(base, &serde_json::to_string(&line)?)
}

/// Append a structured operation event (fork, promote, gate change, ...).
pub fn emit_event(base: &Path, event: &str, data: Value, ts: &str) -> Result<()> {
    let line = serde_json::json!({
        "timestamp": ts,
        "event": event,
        "data": data
    });
    append_line(base, &serde_json::to_string(&line)?)
}

fn append_line(base: &Path, json: &str) -> Result<()> {
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(base.join("logbook.jsonl"))?;
    writeln!(f, "{}", json)?;
    Ok(())
}
