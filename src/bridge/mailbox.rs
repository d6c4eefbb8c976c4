use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::models::PlaybackState;

#[derive(Debug, Default)]
struct Slot {
    pending: bool,
    latest: PlaybackState,
    metadata_advertised: bool,
    shutdown: bool,
}

/// Single-slot handoff from the player's notification threads to the
/// advertiser thread. A post overwrites any state the advertiser has not
/// taken yet.
#[derive(Debug, Default)]
pub struct StateMailbox {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl StateMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Never blocks beyond the O(1) critical section.
    pub fn post(&self, state: PlaybackState) {
        let mut slot = self.slot();
        slot.latest = state;
        slot.pending = true;
        self.wake.notify_one();
    }

    /// Blocks until a state is posted and takes it. Returns `None` once
    /// shutdown has been requested; that is the only place shutdown is seen.
    pub fn wait_and_take(&self) -> Option<PlaybackState> {
        let mut slot = self.slot();
        loop {
            if slot.shutdown {
                return None;
            }
            if slot.pending {
                slot.pending = false;
                return Some(slot.latest);
            }
            slot = self.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn mark_track_changed(&self) {
        self.slot().metadata_advertised = false;
    }

    /// True for exactly one caller per track.
    pub fn try_mark_metadata_advertised(&self) -> bool {
        let mut slot = self.slot();
        if slot.metadata_advertised {
            return false;
        }
        slot.metadata_advertised = true;
        true
    }

    /// Undo a successful `try_mark_metadata_advertised` whose publish failed,
    /// so the next cycle tries again.
    pub fn retract_metadata_advertised(&self) {
        self.slot().metadata_advertised = false;
    }

    pub fn request_shutdown(&self) {
        let mut slot = self.slot();
        slot.shutdown = true;
        self.wake.notify_all();
    }
}
