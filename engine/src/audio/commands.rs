//! Completion queue for playback callbacks
//!
//! Backends that report finished playback from their own thread push the
//! handle here; the ambience system drains the queue at the start of every
//! tick so pool and scheduler state only ever change on the tick thread.

use crate::audio::pool::HandleId;
use std::sync::{Arc, Mutex};

/// Thread-safe queue of handles whose playback has finished
#[derive(Debug, Clone, Default)]
pub struct CompletionQueue {
    finished: Arc<Mutex<Vec<HandleId>>>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that playback on `handle` has completed
    pub fn push(&self, handle: HandleId) {
        self.finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }

    /// Take every pending completion, oldest first
    pub fn drain(&self) -> Vec<HandleId> {
        let mut finished = self
            .finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *finished)
    }

    pub fn len(&self) -> usize {
        self.finished
            .lock()
            .map(|finished| finished.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let queue = CompletionQueue::new();
        queue.push(HandleId(2));
        queue.push(HandleId(0));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![HandleId(2), HandleId(0)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_from_other_thread() {
        let queue = CompletionQueue::new();
        let remote = queue.clone();
        std::thread::spawn(move || remote.push(HandleId(7)))
            .join()
            .unwrap();
        assert_eq!(queue.drain(), vec![HandleId(7)]);
    }
}
