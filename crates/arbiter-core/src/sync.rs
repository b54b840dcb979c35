//! Lock helpers shared by the registry and router.

use std::sync::{Mutex, MutexGuard};

/// Extension trait for acquiring a `Mutex` without caring about poisoning.
///
/// A poisoned lock means another thread panicked while holding the guard.
/// The maps these locks protect stay structurally valid through a panic, so
/// recovery is simply taking the guard as-is.
pub trait LockUnpoisoned<T> {
    /// Acquires the lock, recovering the guard from a poisoned mutex.
    fn lock_unpoisoned(&self) -> MutexGuard<'_, T>;
}

impl<T> LockUnpoisoned<T> for Mutex<T> {
    fn lock_unpoisoned(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_unpoisoned_plain() {
        let mutex = Mutex::new(vec!["initial".to_owned()]);
        mutex.lock_unpoisoned().push("pushed".to_owned());
        assert_eq!(mutex.lock_unpoisoned().len(), 2);
    }

    #[test]
    fn test_lock_unpoisoned_recovers_after_panic() {
        let mutex = Arc::new(Mutex::new(1u32));
        let poisoner = Arc::clone(&mutex);
        let handle = thread::spawn(move || {
            let _guard = poisoner.lock_unpoisoned();
            panic!("poison the lock");
        });
        assert!(handle.join().is_err());

        *mutex.lock_unpoisoned() += 1;
        assert_eq!(*mutex.lock_unpoisoned(), 2);
    }
}
