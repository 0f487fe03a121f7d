// src/session/store.rs
//! Wholesale JSON persistence for checkpoint state.
//!
//! - Stamps land under `<root>/<name>.stamp.json`, projects under
//!   `<root>/projects/<id>.json`.
//! - Every write goes through tmp + rename so readers never see a torn
//!   file. Files are read and written whole, never patched in place;
//!   concurrent writers need external serialization.
//! - A tiny ref file per stamp records the blake3 content id of the last
//!   write. If the content id is unchanged, the save is a no-op and the
//!   existing path is returned.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::services::stamp::Stamp;
use crate::services::tiers::Project;

/// Filesystem-backed store for stamp and project JSON. Root is typically
/// `.olo/sessions`.
#[derive(Debug, Clone)]
pub struct StampStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StampRef {
    file: Option<String>,
    last_cid: Option<String>,
    updated_at: Option<String>,
}

impl StampStore {
    /// Open or initialize a store at the given root (idempotent).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("refs"))?;
        fs::create_dir_all(root.join("projects"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a stamp under `<root>/<name>.stamp.json`, timestamping the
    /// record at write time. Content-unchanged saves are skipped: the cid
    /// is computed over the record with its timestamp cleared, so a
    /// re-save of identical state rewrites nothing.
    pub fn save_stamp(&self, name: &str, stamp: &Stamp) -> Result<PathBuf> {
        let mut record = stamp.clone();
        record.timestamp = String::new();
        let cid = blake3::hash(serde_json::to_vec(&record)?.as_slice())
            .to_hex()
            .to_string();

        let fname = format!("{}.stamp.json", sanitize(name));
        let path = self.root.join(&fname);

        let mut sref = self.read_ref(name)?;
        if sref.last_cid.as_deref() == Some(&cid) && path.exists() {
            return Ok(path); // idempotent: nothing to write
        }

        let now = Utc::now().to_rfc3339();
        record.timestamp = now.clone();
        write_atomic(&path, &serde_json::to_vec_pretty(&record)?)?;

        sref.file = Some(fname);
        sref.last_cid = Some(cid);
        sref.updated_at = Some(now);
        self.write_ref(name, &sref)?;
        Ok(path)
    }

    /// Load a stamp wholesale. `Ok(None)` when no file exists.
    pub fn load_stamp(&self, name: &str) -> Result<Option<Stamp>> {
        let path = self.root.join(format!("{}.stamp.json", sanitize(name)));
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("read {:?}", path))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Persist an entire project (tiers, artifacts, bucket, gates) whole.
    pub fn save_project(&self, project: &Project) -> Result<PathBuf> {
        let path = self.project_path(&project.id);
        write_atomic(&path, &serde_json::to_vec_pretty(project)?)?;
        Ok(path)
    }

    pub fn load_project(&self, project_id: &str) -> Result<Option<Project>> {
        let path = self.project_path(project_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("read {:?}", path))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn project_exists(&self, project_id: &str) -> bool {
        self.project_path(project_id).exists()
    }

    fn project_path(&self, project_id: &str) -> PathBuf {
        self.root
            .join("projects")
            .join(format!("{}.json", sanitize(project_id)))
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join("refs").join(format!("{}.json", sanitize(name)))
    }

    fn read_ref(&self, name: &str) -> Result<StampRef> {
        let p = self.ref_path(name);
        if !p.exists() {
            return Ok(StampRef::default());
        }
        let bytes = fs::read(&p)?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn write_ref(&self, name: &str, r: &StampRef) -> Result<()> {
        write_atomic(&self.ref_path(name), &serde_json::to_vec_pretty(r)?)
    }
}

/// Write-through-temp-then-rename so a crash never leaves a half file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all({:?})", parent))?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp).with_context(|| format!("open temp file {:?}", tmp))?;
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

pub(crate) fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
