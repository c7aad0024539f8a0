//! Read and write sections over the store's shared state.
//!
//! - **Read section**: shared, re-entrant. Nested read sections on the same
//!   thread never deadlock behind a waiting writer.
//! - **Write section**: exclusive. Recursive write entry (or a write while the
//!   same thread holds a read section) deadlocks and must be avoided by callers.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Reader/writer lock with a nesting counter and a write generation.
pub struct SectionLock<T> {
    inner: RwLock<T>,

    /// Number of read sections currently open (all threads).
    read_depth: AtomicUsize,

    /// Bumped each time a write section closes.
    generation: AtomicU64,
}

impl<T> SectionLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
            read_depth: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Enter a read section. Blocks only while a write is in progress.
    pub fn read(&self) -> ReadSection<'_, T> {
        let guard = self.inner.read_recursive();
        self.read_depth.fetch_add(1, Ordering::SeqCst);
        ReadSection { guard, lock: self }
    }

    /// Enter the exclusive write section.
    pub fn write(&self) -> WriteSection<'_, T> {
        WriteSection {
            guard: self.inner.write(),
            lock: self,
        }
    }

    pub fn read_depth(&self) -> usize {
        self.read_depth.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Guard for a shared read section.
pub struct ReadSection<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    lock: &'a SectionLock<T>,
}

impl<T> Deref for ReadSection<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> Drop for ReadSection<'_, T> {
    fn drop(&mut self) {
        self.lock.read_depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Guard for the exclusive write section.
pub struct WriteSection<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    lock: &'a SectionLock<T>,
}

impl<T> Deref for WriteSection<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for WriteSection<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for WriteSection<'_, T> {
    fn drop(&mut self) {
        self.lock.generation.fetch_add(1, Ordering::SeqCst);
    }
}
