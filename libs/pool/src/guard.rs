//! Re-entrancy lock shared by every pool entry point

use crate::error::{PoolError, PoolResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag held while a pool operation is in flight
///
/// Clones share the flag, so a host can hand one to code that might call back
/// into the pool and have the nested call rejected.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyLock {
    entered: Arc<AtomicBool>,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter, failing if an operation is already in flight
    pub fn acquire(&self) -> PoolResult<LockGuard> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| PoolError::Reentrancy)?;
        Ok(LockGuard {
            entered: Arc::clone(&self.entered),
        })
    }

    pub fn is_held(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Releases the lock when dropped, on success and error paths alike
#[derive(Debug)]
pub struct LockGuard {
    entered: Arc<AtomicBool>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_acquire_rejected() {
        let lock = ReentrancyLock::new();
        let guard = lock.acquire().unwrap();
        assert!(lock.is_held());
        assert_eq!(lock.clone().acquire().unwrap_err(), PoolError::Reentrancy);
        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.acquire().is_ok());
    }

    #[test]
    fn test_released_on_early_return() {
        fn fails(lock: &ReentrancyLock) -> PoolResult<()> {
            let _guard = lock.acquire()?;
            Err(PoolError::ZeroAmount)
        }
        let lock = ReentrancyLock::new();
        assert!(fails(&lock).is_err());
        assert!(!lock.is_held());
    }
}
