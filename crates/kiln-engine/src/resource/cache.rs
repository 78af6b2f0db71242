use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::{Rc, Weak};

use anyhow::Result;

/// Path-keyed cache holding at most one live instance per resource.
///
/// Entries are weak: the cache never keeps a resource alive by itself, and a
/// fetch after every handle dropped loads it again.
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: HashMap<PathBuf, Weak<T>>,
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the live instance for `key`, or runs `load` and remembers the result.
    ///
    /// `load` receives the normalized key. A failed load leaves the cache unchanged.
    pub fn fetch<F>(&mut self, key: impl AsRef<Path>, load: F) -> Result<Rc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let key = normalize(key.as_ref());
        if let Some(live) = self.entries.get(&key).and_then(Weak::upgrade) {
            log::trace!("cache hit: {}", key.display());
            return Ok(live);
        }

        log::debug!("cache miss: {}", key.display());
        let value = Rc::new(load(&key)?);
        self.entries.insert(key, Rc::downgrade(&value));
        Ok(value)
    }

    /// Live instance for `key`, without loading.
    pub fn get(&self, key: impl AsRef<Path>) -> Option<Rc<T>> {
        self.entries
            .get(&normalize(key.as_ref()))
            .and_then(Weak::upgrade)
    }

    /// Number of entries, dead ones included until `purge`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries whose resource is gone.
    pub fn purge(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }
}

/// Lexical normalization: drops `.`, folds `name/..`. Leading `..` are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    // ── normalize ─────────────────────────────────────────────────────────

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("a/./b/../c.png")), PathBuf::from("a/c.png"));
        assert_eq!(normalize(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
    }

    // ── fetch ─────────────────────────────────────────────────────────────

    #[test]
    fn fetch_while_held_returns_same_instance() {
        let mut cache = ResourceCache::new();
        let loads = Cell::new(0);
        let load = |_: &Path| {
            loads.set(loads.get() + 1);
            Ok(42u32)
        };

        let a = cache.fetch("tex/a.png", load).unwrap();
        let b = cache.fetch("tex/./a.png", load).unwrap();

        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn fetch_after_drop_reloads() {
        let mut cache = ResourceCache::new();
        let loads = Cell::new(0);
        let load = |_: &Path| {
            loads.set(loads.get() + 1);
            Ok(String::from("pixels"))
        };

        drop(cache.fetch("a.png", load).unwrap());
        assert!(cache.get("a.png").is_none());

        let _again = cache.fetch("a.png", load).unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache: ResourceCache<u8> = ResourceCache::new();

        let err = cache.fetch("missing.png", |_| anyhow::bail!("not found"));

        assert!(err.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_drops_dead_entries() {
        let mut cache = ResourceCache::new();
        let kept = cache.fetch("kept", |_| Ok(1)).unwrap();
        drop(cache.fetch("gone", |_| Ok(2)).unwrap());
        assert_eq!(cache.len(), 2);

        cache.purge();

        assert_eq!(cache.len(), 1);
        assert!(Rc::ptr_eq(&kept, &cache.get("kept").unwrap()));
    }
}
