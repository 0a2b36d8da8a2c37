//! Read-through dataset cache.
//!
//! Entries are keyed by the canonical source path, the period split and the
//! SHA-256 of the file content, so an edited file is a different key. The
//! parse for a key runs while the cache lock is held: concurrent callers for
//! the same source state wait and then share one `Arc<Dataset>`, and nobody
//! can see a dataset before it is complete.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::domain::{Dataset, PeriodSplit};
use crate::error::MetricsError;
use crate::io::ingest::{SourceLayout, parse_dataset};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    split: PeriodSplit,
    digest: String,
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    layout: SourceLayout,
    entries: Mutex<HashMap<CacheKey, Arc<Dataset>>>,
}

impl DatasetCache {
    pub fn new(layout: SourceLayout) -> Self {
        Self {
            layout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached dataset for the current content of `path`, loading it
    /// on a miss.
    pub fn get_or_load(&self, path: &Path, split: PeriodSplit) -> Result<Arc<Dataset>, MetricsError> {
        let (key, bytes) = self.read_source(path, split)?;
        let mut entries = self.lock();

        if let Some(hit) = entries.get(&key) {
            tracing::debug!(source = %path.display(), digest = %short(&key.digest), "dataset cache hit");
            return Ok(Arc::clone(hit));
        }

        tracing::debug!(source = %path.display(), digest = %short(&key.digest), "dataset cache miss");
        self.insert(&mut entries, key, path, &bytes)
    }

    /// Parse `path` again even if an entry exists, replacing it.
    pub fn reload(&self, path: &Path, split: PeriodSplit) -> Result<Arc<Dataset>, MetricsError> {
        let (key, bytes) = self.read_source(path, split)?;
        let mut entries = self.lock();
        entries.remove(&key);
        tracing::debug!(source = %path.display(), "forced dataset reload");
        self.insert(&mut entries, key, path, &bytes)
    }

    /// Drop every entry for `path`.
    pub fn invalidate(&self, path: &Path) {
        let path = canonical(path);
        self.lock().retain(|k, _| k.path != path);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn read_source(&self, path: &Path, split: PeriodSplit) -> Result<(CacheKey, Vec<u8>), MetricsError> {
        let bytes = std::fs::read(path).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let key = CacheKey {
            path: canonical(path),
            split,
            digest,
        };
        Ok((key, bytes))
    }

    fn insert(
        &self,
        entries: &mut HashMap<CacheKey, Arc<Dataset>>,
        key: CacheKey,
        path: &Path,
        bytes: &[u8],
    ) -> Result<Arc<Dataset>, MetricsError> {
        let dataset = Arc::new(parse_dataset(bytes, path, key.split, self.layout)?);
        // Older content of the same source is never served again.
        entries.retain(|k, _| !(k.path == key.path && k.split == key.split));
        entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<Dataset>>> {
        // A panic during a parse leaves the map untouched, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
