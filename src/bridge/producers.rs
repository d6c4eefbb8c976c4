use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, trace};

use super::mailbox::StateMailbox;
use crate::models::PlaybackState;
use crate::player::{Input, InputEvent, ListenerId};

struct Held {
    input: Arc<dyn Input>,
    listener: ListenerId,
    generation: u64,
}

impl Held {
    fn detach(self) {
        self.input.unsubscribe(self.listener);
    }
}

#[derive(Default)]
struct Slot {
    held: Option<Held>,
    // Generation that died while its subscription was still being set up.
    dead_on_arrival: Option<u64>,
}

/// The currently held item. Written only by the track-change and death
/// producers; the advertiser clones the reference to read metadata.
///
/// The slot lock only covers swapping the handle in and out. Calls into the
/// item (subscribe, unsubscribe) happen after it is released.
#[derive(Default)]
pub struct ActiveTrack {
    slot: Mutex<Slot>,
    generation: AtomicU64,
}

impl ActiveTrack {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Arc<dyn Input>> {
        self.slot()
            .held
            .as_ref()
            .map(|held| Arc::clone(&held.input))
    }

    pub fn is_held(&self) -> bool {
        self.slot().held.is_some()
    }

    /// Drop whatever is held and detach its listener. Used at teardown.
    pub fn release(&self) {
        let held = self.slot().held.take();
        if let Some(held) = held {
            held.detach();
        }
    }
}

/// Entry points called synchronously on the player's notification threads.
pub struct EventProducers {
    mailbox: Arc<StateMailbox>,
    active: Arc<ActiveTrack>,
}

impl EventProducers {
    pub fn new(mailbox: Arc<StateMailbox>, active: Arc<ActiveTrack>) -> Self {
        Self { mailbox, active }
    }

    pub fn on_state_change(&self, state: PlaybackState) {
        trace!("Input state changed to {state}");
        self.mailbox.post(state);
    }

    pub fn on_track_change(self: &Arc<Self>, input: Option<Arc<dyn Input>>) {
        // Track end arrives separately as a death notification.
        let Some(input) = input else {
            trace!("Active track cleared");
            return;
        };

        let generation = self.active.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let producers = Arc::downgrade(self);
        let listener = input.subscribe(Arc::new(move |event: InputEvent| {
            let Some(producers) = producers.upgrade() else {
                return;
            };
            match event {
                InputEvent::StateChanged(state) => producers.on_state_change(state),
                InputEvent::Dead => producers.on_track_dead(generation),
            }
        }));
        let incoming = Held {
            input,
            listener,
            generation,
        };

        let (previous, rejected) = {
            let mut slot = self.active.slot();
            let previous = slot.held.take();
            self.mailbox.mark_track_changed();
            if slot.dead_on_arrival.take() == Some(generation) {
                (previous, Some(incoming))
            } else {
                slot.held = Some(incoming);
                (previous, None)
            }
        };

        if let Some(previous) = previous {
            previous.detach();
        }
        match rejected {
            Some(rejected) => {
                debug!("Track died before it was held (generation {generation})");
                rejected.detach();
            }
            None => debug!("Active track changed (generation {generation})"),
        }
    }

    /// Release the handle for the track subscribed as `generation`.
    pub fn on_track_dead(&self, generation: u64) {
        let latest = self.active.generation.load(Ordering::Acquire);
        let dead = {
            let mut slot = self.active.slot();
            let held = slot.held.as_ref().map(|held| held.generation);
            if held == Some(generation) {
                slot.held.take()
            } else if generation > latest {
                error!("Death notification with no track held");
                debug_assert!(false, "death notification with no track held");
                None
            } else if generation == latest {
                // on_track_change has not stored this generation yet.
                slot.dead_on_arrival = Some(generation);
                None
            } else {
                trace!("Ignoring death of superseded track (generation {generation})");
                None
            }
        };

        if let Some(dead) = dead {
            dead.detach();
            debug!("Released dead track (generation {generation})");
        }
    }
}
