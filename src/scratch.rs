use std::cell::RefCell;

/// A thread-local free-list of reusable scratch buffers: preallocated
/// per-thread state acquired at task start and released at task end. `T` is
/// typically a `Vec<f64>` or similar; callers supply a `make` closure to
/// build a fresh buffer on first use.
pub struct ScratchPool<T> {
    free: RefCell<Vec<T>>,
}

impl<T> Default for ScratchPool<T> {
    fn default() -> Self {
        ScratchPool {
            free: RefCell::new(Vec::new()),
        }
    }
}

impl<T> ScratchPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a buffer, constructing one with `make` if the pool is empty.
    /// The returned guard returns the buffer to the pool on drop.
    pub fn acquire<F: FnOnce() -> T>(&self, make: F) -> ScratchGuard<'_, T> {
        let buf = self.free.borrow_mut().pop().unwrap_or_else(make);
        ScratchGuard { pool: self, buf: Some(buf) }
    }
}

pub struct ScratchGuard<'a, T> {
    pool: &'a ScratchPool<T>,
    buf: Option<T>,
}

impl<'a, T> std::ops::Deref for ScratchGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.buf.as_ref().unwrap()
    }
}

impl<'a, T> std::ops::DerefMut for ScratchGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.buf.as_mut().unwrap()
    }
}

impl<'a, T> Drop for ScratchGuard<'a, T> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.free.borrow_mut().push(buf);
        }
    }
}

thread_local! {
    /// The per-thread scratch pool used by [`crate::pair_search::search_window_thinned`]
    /// for its per-marker weight buffer. One pool per OS thread backing the
    /// rayon pool; never shared across threads, so no synchronisation is
    /// needed.
    pub static PAIR_SEARCH_SCRATCH: ScratchPool<Vec<f64>> = ScratchPool::new();
}
