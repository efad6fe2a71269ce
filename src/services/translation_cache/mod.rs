//! `(source text, target language) → translation` cache shared by every
//! translation pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::CacheIoError;
use crate::model::language::LanguageCode;

pub mod model;
pub mod store;

use model::CacheEntry;

#[derive(Debug, Default)]
pub struct TranslationCache {
    /// `None` when persistence is disabled.
    path: Option<PathBuf>,
    entries: BTreeMap<(LanguageCode, String), String>,
    dirty: bool,
}

impl TranslationCache {
    /// In-memory only: nothing is read and nothing is persisted.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn try_load(path: &Path) -> Result<Self, CacheIoError> {
        let entries = store::load(path)?
            .into_iter()
            .map(|e| ((e.target_lang, e.original), e.translation))
            .collect();

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
            dirty: false,
        })
    }

    /// Like [`try_load`](Self::try_load), but an unusable cache file only
    /// costs the persistence, not the pass.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(cache) => {
                info!(path = %path.display(), entries = cache.len(), "translation cache loaded");
                cache
            }
            Err(e) => {
                warn!("{e}; continuing without translation cache");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, target: LanguageCode, original: &str) -> Option<&str> {
        // BTreeMap<(_, String)> cannot be queried by &str without an owned key
        self.entries
            .get(&(target, original.to_string()))
            .map(String::as_str)
    }

    /// Records a translation. An existing mapping is never replaced; returns
    /// whether the entry was new.
    pub fn insert(&mut self, target: LanguageCode, original: &str, translation: &str) -> bool {
        use std::collections::btree_map::Entry;

        match self.entries.entry((target, original.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(translation.to_string());
                self.dirty = true;
                true
            }
        }
    }

    /// Writes the cache if it changed since loading. Returns whether it wrote.
    pub fn persist(&mut self) -> Result<bool, CacheIoError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        if !self.dirty {
            return Ok(false);
        }

        let entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|((lang, original), translation)| CacheEntry {
                original: original.clone(),
                target_lang: *lang,
                translation: translation.clone(),
            })
            .collect();

        store::save(path, &entries)?;
        self.dirty = false;
        info!(path = %path.display(), entries = entries.len(), "translation cache saved");
        Ok(true)
    }

    /// Persists, and on failure falls back to in-memory operation.
    pub fn persist_or_disable(&mut self) {
        if let Err(e) = self.persist() {
            warn!("{e}; translation cache disabled");
            self.path = None;
        }
    }
}
