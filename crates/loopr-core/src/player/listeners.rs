//! Observers notified when the audio source is replaced

use crate::types::SharedSource;

/// Token returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type SourceCallback = Box<dyn FnMut(&SharedSource) + Send>;

/// Registration list of "source changed" callbacks
///
/// Callbacks run on the control thread in registration order.
#[derive(Default)]
pub struct SourceListeners {
    next_id: u64,
    listeners: Vec<(ListenerId, SourceCallback)>,
}

impl SourceListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, returning its removal token
    pub fn add<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&SharedSource) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Unregister a callback; returns false if the token was unknown
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&mut self, source: &SharedSource) {
        for (_, callback) in &mut self.listeners {
            callback(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn source() -> SharedSource {
        AudioSource::new(vec![vec![0.0; 4]], 4).unwrap().into_shared()
    }

    #[test]
    fn test_notify_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut listeners = SourceListeners::new();
        for tag in 0..3 {
            let order = Arc::clone(&order);
            listeners.add(move |_| order.lock().unwrap().push(tag));
        }
        listeners.notify(&source());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_by_token() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut listeners = SourceListeners::new();

        let counter = Arc::clone(&hits);
        let first = listeners.add(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let counter = Arc::clone(&hits);
        let second = listeners.add(move |_| {
            counter.fetch_add(10, Ordering::Relaxed);
        });
        assert_ne!(first, second);

        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        listeners.notify(&source());
        assert_eq!(hits.load(Ordering::Relaxed), 10);
        assert_eq!(listeners.len(), 1);
    }
}
