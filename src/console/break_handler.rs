//! Interrupt (Ctrl+C) handlers
//!
//! Handlers form a stack: only the most recently registered one runs. The
//! registration handle removes exactly its own handler when released, so
//! handlers may be released out of order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::scope::Disposable;

/// Callback run on an interrupt
pub type BreakHandler = Box<dyn Fn() + Send + Sync>;

type Entry = (u64, Arc<dyn Fn() + Send + Sync>);

fn lock_entries(handlers: &Mutex<Vec<Entry>>) -> MutexGuard<'_, Vec<Entry>> {
    handlers.lock().unwrap_or_else(|e| e.into_inner())
}

/// LIFO stack of break handlers, shareable with the signal thread
#[derive(Clone, Default)]
pub struct BreakHandlerStack {
    handlers: Arc<Mutex<Vec<Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl BreakHandlerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `handler`; releasing the returned handle removes it again
    pub fn push(&self, handler: BreakHandler) -> Disposable {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock_entries(&self.handlers).push((id, Arc::from(handler)));

        let handlers = Arc::clone(&self.handlers);
        Disposable::from_fn(move || {
            lock_entries(&handlers).retain(|(entry_id, _)| *entry_id != id);
        })
    }

    /// Run the newest handler. Returns false when the stack is empty.
    pub fn invoke(&self) -> bool {
        // Clone out so the handler runs without the lock held
        let top = lock_entries(&self.handlers)
            .last()
            .map(|(_, handler)| Arc::clone(handler));
        match top {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        lock_entries(&self.handlers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(count: &Arc<AtomicUsize>) -> BreakHandler {
        let count = Arc::clone(count);
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_only_newest_handler_runs() {
        let stack = BreakHandlerStack::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let _a = stack.push(counting_handler(&first));
        let b = stack.push(counting_handler(&second));

        assert!(stack.invoke());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        drop(b);
        assert!(stack.invoke());
        assert_eq!(first.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_removes_by_identity() {
        let stack = BreakHandlerStack::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let a = stack.push(counting_handler(&first));
        let _b = stack.push(counting_handler(&second));

        // Releasing the older handler leaves the newer one on top
        a.dispose();
        assert_eq!(stack.len(), 1);
        stack.invoke();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poisoned_stack_keeps_working() {
        let stack = BreakHandlerStack::new();
        let shared = stack.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.handlers.lock();
            panic!("poison the handler lock");
        })
        .join();
        assert!(stack.handlers.is_poisoned());

        let count = Arc::new(AtomicUsize::new(0));
        let registration = stack.push(counting_handler(&count));
        assert_eq!(stack.len(), 1);
        assert!(stack.invoke());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(registration);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_empty_stack_reports_unhandled() {
        let stack = BreakHandlerStack::new();
        assert!(!stack.invoke());
        assert!(stack.is_empty());
    }
}
