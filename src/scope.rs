//! Scoped resource release.
//!
//! `Disposable` pairs a value with the code that releases it. The release
//! runs exactly once: either when `dispose()` is called or when the handle is
//! dropped, whichever happens first. Early returns, `?` and panics unwinding
//! through the owning scope all release the resource.

use std::fmt;

/// Release callback for a value of type `T`
type Release<T> = Box<dyn FnOnce(T)>;

/// Handle whose release is guaranteed to run once
pub struct Disposable<T = ()> {
    slot: Option<(T, Release<T>)>,
}

impl<T> Disposable<T> {
    /// Wrap `value`; `release` receives it back when the handle is released.
    ///
    /// If `value` is itself a `Disposable`, it is released right after
    /// `release` returns (unless `release` disposes it first), so nested
    /// resources are always released exactly once.
    pub fn new(value: T, release: impl FnOnce(T) + 'static) -> Self {
        Self {
            slot: Some((value, Box::new(release))),
        }
    }

    /// Borrow the wrapped value, `None` once released
    pub fn value(&self) -> Option<&T> {
        self.slot.as_ref().map(|(value, _)| value)
    }

    /// Release now instead of at end of scope
    pub fn dispose(mut self) {
        self.release();
    }

    /// Whether the release has not run yet
    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    fn release(&mut self) {
        if let Some((value, release)) = self.slot.take() {
            release(value);
        }
    }
}

impl Disposable<()> {
    /// Handle that runs `release` when the scope ends
    pub fn from_fn(release: impl FnOnce() + 'static) -> Self {
        Self::new((), move |()| release())
    }

    /// Handle with nothing to release
    pub fn empty() -> Self {
        Self { slot: None }
    }
}

impl<T> Drop for Disposable<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: fmt::Debug> fmt::Debug for Disposable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("value", &self.value())
            .field("active", &self.is_active())
            .finish()
    }
}
