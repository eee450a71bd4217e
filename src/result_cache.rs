//! File-backed memo of (title file, reference) → count result.
//!
//! Parsing a full title to count one subtree is the expensive step of the
//! pipeline, and the result is a deterministic function of the file content
//! and the reference, so it is memoized on disk: one JSON artifact per key,
//! named by the SHA-256 of the normalized filename plus the canonicalized
//! reference. A miss (including a corrupt or unreadable artifact) always
//! falls through to live computation. Entries are never invalidated in
//! place — a changed reference or filename simply produces a new key.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::fetch::write_atomic;
use crate::models::{CfrReference, CountResult};

pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Stable key over everything that affects navigation: the title file's
    /// basename and every structural level of the reference, absent levels
    /// included.
    pub fn key(filename: &str, reference: &CfrReference) -> String {
        let basename = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());

        let canonical = format!(
            "{}|title={}|chapter={}|part={}",
            basename,
            reference.title,
            reference.chapter.as_deref().unwrap_or("-"),
            reference.part.as_deref().unwrap_or("-"),
        );

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<CountResult> {
        let bytes = std::fs::read(self.path_for(key)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn put(&self, key: &str, result: &CountResult) -> Result<()> {
        let bytes = serde_json::to_vec(result)?;
        write_atomic(&self.path_for(key), &bytes)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}
