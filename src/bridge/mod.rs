//! Keeps the OS transport controls in step with the player.
//!
//! Player callbacks post into a [`StateMailbox`]; a dedicated advertiser
//! thread drains it and drives the transport session. Button presses flow
//! back through the [`CommandRouter`] into the playlist.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::config::DisplayConfig;
use crate::error::BridgeError;
use crate::player::{Input, ListenerId, Playlist};
use crate::session::SessionFactory;

mod advertiser;
mod mailbox;
mod producers;
mod router;

use advertiser::Advertiser;
use mailbox::StateMailbox;
use producers::{ActiveTrack, EventProducers};
use router::CommandRouter;

pub struct Bridge {
    playlist: Arc<dyn Playlist>,
    mailbox: Arc<StateMailbox>,
    active: Arc<ActiveTrack>,
    subscription: Option<ListenerId>,
    thread: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Start the advertiser and subscribe to the playlist. Fails without
    /// leaving anything running if the transport controls cannot be set up.
    pub fn open(
        playlist: Arc<dyn Playlist>,
        factory: SessionFactory,
        display: DisplayConfig,
    ) -> Result<Self, BridgeError> {
        let mailbox = Arc::new(StateMailbox::new());
        let active = Arc::new(ActiveTrack::default());
        let buttons = CommandRouter::new(Arc::clone(&playlist)).into_handler();

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let thread_mailbox = Arc::clone(&mailbox);
        let thread_active = Arc::clone(&active);
        let thread = thread::Builder::new()
            .name("nowplaying-advertiser".to_string())
            .spawn(move || {
                Advertiser::run(
                    factory,
                    buttons,
                    thread_mailbox,
                    thread_active,
                    display,
                    ready_tx,
                );
            })
            .map_err(BridgeError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(BridgeError::Initialization(e));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(BridgeError::ThreadExited);
            }
        }

        let producers = Arc::new(EventProducers::new(
            Arc::clone(&mailbox),
            Arc::clone(&active),
        ));
        let subscription = playlist.subscribe_current(Arc::new(move |input: Option<Arc<dyn Input>>| {
            producers.on_track_change(input);
        }));

        info!("Now-playing bridge opened");
        Ok(Self {
            playlist,
            mailbox,
            active,
            subscription: Some(subscription),
            thread: Some(thread),
        })
    }

    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        if let Some(subscription) = self.subscription.take() {
            self.playlist.unsubscribe_current(subscription);
        }
        if self.active.is_held() {
            debug!("Releasing track still held at close");
            self.active.release();
        }

        self.mailbox.request_shutdown();
        if thread.join().is_err() {
            warn!("Advertiser thread panicked");
        }
        info!("Now-playing bridge closed");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.teardown();
    }
}
