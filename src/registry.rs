//! Caller-constructed collaborators: the handle registry and the
//! windowed-average cache.
//!
//! Both are explicit context objects owned by the caller rather than
//! process-wide state. Neither is required for the correctness of a
//! single handle's operations.

use crate::error::Result;
use crate::map::FixedMap;
use crate::store::Store;
use crate::value::Value;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared ownership of one open store.
pub type SharedStore = Arc<Mutex<Store>>;

const REGISTRY_CAPACITY: usize = 32;
const CACHE_CAPACITY: usize = 64;

/// One shared handle per store name.
///
/// `open` hands out clones of the same `Arc` for a given name, so every
/// caller observes one in-memory header per backing file. Closing through
/// the registry finalizes the store in place; surviving clones see a
/// finalized handle rather than a dangling one.
pub struct StoreRegistry {
    dir: PathBuf,
    handles: FixedMap<String, SharedStore, REGISTRY_CAPACITY>,
}

impl StoreRegistry {
    /// Registry rooted at `dir`; stores live at `<dir>/<name>.sdb`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        StoreRegistry {
            dir: dir.into(),
            handles: FixedMap::new(),
        }
    }

    /// The registered handle for `name`, or open (creating the file if
    /// absent) and register one. Fails with `TableFull` at capacity.
    pub fn open(&mut self, name: &str) -> Result<SharedStore> {
        let key = name.to_string();
        if let Some(handle) = self.handles.get(&key) {
            return Ok(Arc::clone(handle));
        }

        let path = self.dir.join(format!("{name}.sdb"));
        let store = Store::open(path, name)?;
        let handle = Arc::new(Mutex::new(store));

        if let Err(e) = self.handles.insert(key, Arc::clone(&handle)) {
            handle.lock().close().ok();
            return Err(e);
        }

        Ok(handle)
    }

    /// Look up a registered handle without opening anything.
    pub fn get(&self, name: &str) -> Option<SharedStore> {
        self.handles.get(&name.to_string()).map(Arc::clone)
    }

    /// Close the named store and drop it from the registry.
    ///
    /// Unknown names succeed.
    pub fn close(&mut self, name: &str) -> Result<()> {
        if let Some(handle) = self.handles.remove(&name.to_string()) {
            handle.lock().close()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Bounded memo of windowed-average results.
///
/// Keys pack `(index, window)` into one integer. Entries go stale on
/// append; callers clear the cache after mutating the store.
pub struct WindowCache {
    entries: FixedMap<u64, Value, CACHE_CAPACITY>,
}

impl WindowCache {
    pub fn new() -> Self {
        WindowCache {
            entries: FixedMap::new(),
        }
    }

    fn key(index: u32, window: u32) -> u64 {
        (index as u64) << 32 | window as u64
    }

    /// Cached moving average, computing and memoizing on a miss. A full
    /// table serves the computed value without memoizing it.
    pub fn moving_average(&mut self, store: &mut Store, index: u32, window: u32) -> Value {
        let key = Self::key(index, window);
        if let Some(&value) = self.entries.get(&key) {
            return value;
        }

        let value = store.moving_average(index, window);
        if self.entries.insert(key, value).is_err() {
            tracing::debug!(index, window, "window cache full, result not memoized");
        }
        value
    }

    /// Drop every entry; call after appending to the store.
    pub fn clear(&mut self) {
        self.entries = FixedMap::new();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WindowCache {
    fn default() -> Self {
        Self::new()
    }
}
