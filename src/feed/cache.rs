use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::filter::{default_filters, FeedFilter};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Filter cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Filter cache encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    last_used: Option<String>,
    #[serde(default)]
    filters: Vec<FeedFilter>,
}

/// User-created filters and the last-used selection, kept in one JSON file.
pub struct FilterCache {
    path: PathBuf,
    data: CacheFile,
}

impl FilterCache {
    /// Load the cache at `path`. A missing file is an empty cache; an unreadable
    /// one is logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let data = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt filter cache {}: {}", path.display(), e);
                CacheFile::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => CacheFile::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Built-in filters first, then the user's, in insertion order.
    pub fn all_filters(&self) -> Vec<FeedFilter> {
        let mut all = default_filters();
        all.extend(self.data.filters.iter().cloned());
        all
    }

    pub fn user_filters(&self) -> &[FeedFilter] {
        &self.data.filters
    }

    pub fn find(&self, id: &str) -> Option<FeedFilter> {
        self.data
            .filters
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .or_else(|| default_filters().into_iter().find(|f| f.id == id))
    }

    pub fn last_used(&self) -> Option<&str> {
        self.data.last_used.as_deref()
    }

    /// The last-used filter, if it still exists.
    pub fn active(&self) -> Option<FeedFilter> {
        self.last_used().and_then(|id| self.find(id))
    }

    /// Insert or replace a user filter, bump its usage and make it last-used.
    pub fn save(&mut self, mut filter: FeedFilter) -> Result<FeedFilter, CacheError> {
        match self.data.filters.iter().position(|f| f.id == filter.id) {
            Some(idx) => {
                let existing = &mut self.data.filters[idx];
                filter.usage_count = existing.usage_count.max(filter.usage_count) + 1;
                *existing = filter.clone();
            }
            None => {
                filter.usage_count += 1;
                self.data.filters.push(filter.clone());
            }
        }
        self.data.last_used = Some(filter.id.clone());
        self.persist()?;

        tracing::debug!(id = %filter.id, "Saved feed filter");
        Ok(filter)
    }

    /// Mark an existing filter (built-in or user) as last-used.
    pub fn select(&mut self, id: &str) -> Result<FeedFilter, CacheError> {
        let filter = self
            .find(id)
            .ok_or_else(|| CacheError::UnknownFilter(id.to_string()))?;
        self.data.last_used = Some(filter.id.clone());
        self.persist()?;
        Ok(filter)
    }

    pub fn clear_active(&mut self) -> Result<(), CacheError> {
        self.data.last_used = None;
        self.persist()
    }

    /// Atomic replace via a sibling temp file.
    fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
