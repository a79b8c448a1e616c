//! Page storage - state that outlives the widget that wrote it
//!
//! Virtualized lists destroy the state of items scrolled out of view. Widgets
//! that want to come back in the same shape (an expanded tile stays expanded)
//! write a small value under a stable [`StorageKey`] and read it back when
//! they are recreated.
//!
//! Unlike reactive state, writing to page storage never triggers a rebuild.
//!
//! ```ignore
//! let storage = PageStorage::new();
//! let key = StorageKey::new("inbox").child("thread-42");
//!
//! storage.write_state(&key, true);
//! assert_eq!(storage.read_state::<bool>(&key), Some(true));
//! ```

use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Stable identity of a widget across rebuilds
///
/// Built from path segments so nested lists can scope their children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a key scoped under this one
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        Self(format!("{}/{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A shared bucket of type-erased values keyed by widget identity
///
/// Cloning yields another handle to the same bucket.
#[derive(Clone, Default)]
pub struct PageStorage {
    entries: Rc<RefCell<FxHashMap<StorageKey, Box<dyn Any>>>>,
}

impl PageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value; `None` if absent or stored with another type
    pub fn read_state<T: Clone + 'static>(&self, key: &StorageKey) -> Option<T> {
        let entries = self.entries.borrow();
        let value = entries.get(key)?;
        match value.downcast_ref::<T>() {
            Some(v) => Some(v.clone()),
            None => {
                tracing::warn!(
                    "PageStorage::read_state: value under '{}' is not a {}",
                    key,
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Store a value, replacing whatever was under `key`
    pub fn write_state<T: 'static>(&self, key: &StorageKey, value: T) {
        tracing::trace!("PageStorage::write_state '{}'", key);
        self.entries
            .borrow_mut()
            .insert(key.clone(), Box::new(value));
    }

    pub fn remove(&self, key: &StorageKey) -> bool {
        self.entries.borrow_mut().remove(key).is_some()
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<StorageKey> {
        let mut keys: Vec<_> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for PageStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStorage")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let storage = PageStorage::new();
        let key = StorageKey::new("list").child(3);

        assert_eq!(storage.read_state::<bool>(&key), None);
        storage.write_state(&key, true);
        assert_eq!(storage.read_state::<bool>(&key), Some(true));
        assert_eq!(key.as_str(), "list/3");
    }

    #[test]
    fn test_wrong_type_reads_none() {
        let storage = PageStorage::new();
        let key = StorageKey::from("tile");
        storage.write_state(&key, 7_u32);
        assert_eq!(storage.read_state::<bool>(&key), None);
        assert_eq!(storage.read_state::<u32>(&key), Some(7));
    }

    #[test]
    fn test_clones_share_bucket() {
        let storage = PageStorage::new();
        let other = storage.clone();
        other.write_state(&StorageKey::new("a"), 1_i32);
        assert!(storage.contains(&StorageKey::new("a")));
        assert_eq!(storage.len(), 1);

        assert!(storage.remove(&StorageKey::new("a")));
        assert!(other.is_empty());
    }
}
