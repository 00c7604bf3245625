use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One mutex per collection, created on first use.
///
/// The map itself sits behind a single mutex so that two threads asking for a
/// new collection at the same time always get the same lock back.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, collection: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(collection.to_string()).or_default())
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquires a collection lock. The mutex guards no data, so a poisoned lock
/// is as good as a clean one.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_name_same_lock() {
        let registry = LockRegistry::new();
        let a = registry.lock_for("posts");
        let b = registry.lock_for("posts");
        let c = registry.lock_for("users");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_first_use_yields_one_lock() {
        let registry = LockRegistry::new();
        let locks: Vec<Arc<Mutex<()>>> = thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| registry.lock_for("posts")))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(locks.iter().all(|l| Arc::ptr_eq(l, &locks[0])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_poisoned_lock_is_still_usable() {
        let registry = LockRegistry::new();
        let lock = registry.lock_for("posts");
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("writer crashed");
        })
        .join();
        assert!(lock.is_poisoned());
        let _guard = acquire(&lock);
    }
}
