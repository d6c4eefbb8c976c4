//! Interface the bridge consumes from the player core.
//!
//! The player raises notifications synchronously on its own threads. Listeners
//! registered here must return quickly and must not call back into the
//! playlist lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::PlaybackState;

pub mod local;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    StateChanged(PlaybackState),
    /// The item is being torn down; no further events follow.
    Dead,
}

pub type InputListener = Arc<dyn Fn(InputEvent) + Send + Sync>;
pub type CurrentListener = Arc<dyn Fn(Option<Arc<dyn Input>>) + Send + Sync>;

/// One playing item.
pub trait Input: Send + Sync {
    fn state(&self) -> PlaybackState;
    /// Title tag, or the item's name when the tag is missing.
    fn title(&self) -> Option<String>;
    fn artist(&self) -> Option<String>;
    fn subscribe(&self, listener: InputListener) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId);
}

/// Commands reachable only while the playlist lock is held.
pub trait PlaylistCommands {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn next(&mut self);
    fn previous(&mut self);
}

pub trait Playlist: Send + Sync {
    /// Take the playlist lock. It is released when the guard drops.
    fn lock(&self) -> Box<dyn PlaylistCommands + '_>;
    /// Notified whenever the active item changes; `None` when nothing is active.
    fn subscribe_current(&self, listener: CurrentListener) -> ListenerId;
    fn unsubscribe_current(&self, id: ListenerId);
}

/// Registered listeners, dispatched from a snapshot so a listener may
/// unsubscribe itself while being called.
pub struct ListenerSet<F: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Arc<F>)>>,
}

impl<F: ?Sized> Default for ListenerSet<F> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> ListenerSet<F> {
    pub fn add(&self, listener: Arc<F>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
