use std::sync::Arc;
use std::sync::mpsc::SyncSender;

use tracing::{debug, error, info, warn};

use super::mailbox::StateMailbox;
use super::producers::ActiveTrack;
use crate::config::DisplayConfig;
use crate::error::SessionError;
use crate::models::{Artwork, PlaybackState, TrackMetadata, TransportStatus};
use crate::session::{ButtonHandler, DisplayUpdate, SessionFactory, TransportSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Idle,
    Advertising,
    ShuttingDown,
}

/// The single consumer of the mailbox. Owns the transport session for the
/// whole life of the thread.
pub struct Advertiser {
    session: Box<dyn TransportSession>,
    mailbox: Arc<StateMailbox>,
    active: Arc<ActiveTrack>,
    display: DisplayConfig,
    artwork: Artwork,
    phase: Phase,
}

impl Advertiser {
    /// Thread body. Reports the outcome of initialization on `ready` before
    /// entering the advertise loop.
    pub fn run(
        factory: SessionFactory,
        buttons: ButtonHandler,
        mailbox: Arc<StateMailbox>,
        active: Arc<ActiveTrack>,
        display: DisplayConfig,
        ready: SyncSender<Result<(), SessionError>>,
    ) {
        let mut advertiser = match Self::initialize(factory, buttons, mailbox, active, display) {
            Ok(advertiser) => advertiser,
            Err(e) => {
                error!("Failed to initialize transport controls: {e}");
                let _ = ready.send(Err(e));
                return;
            }
        };

        if ready.send(Ok(())).is_err() {
            return;
        }
        advertiser.advertise_loop();
        advertiser.shutdown();
    }

    fn initialize(
        factory: SessionFactory,
        buttons: ButtonHandler,
        mailbox: Arc<StateMailbox>,
        active: Arc<ActiveTrack>,
        display: DisplayConfig,
    ) -> Result<Self, SessionError> {
        let mut session = factory()?;
        let artwork = Artwork::from_uri(display.artwork_url.clone());

        session.subscribe_buttons(buttons)?;
        session.set_playback_status(TransportStatus::Closed)?;
        session.set_enabled(true)?;
        session.update_display(&DisplayUpdate::thumbnail(artwork.clone()))?;

        let mut advertiser = Self {
            session,
            mailbox,
            active,
            display,
            artwork,
            phase: Phase::Uninitialized,
        };
        advertiser.enter(Phase::Idle);
        info!("Transport controls ready");
        Ok(advertiser)
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Advertiser {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    // Shutdown is only observed inside wait_and_take, so a cycle that has
    // started always runs to completion.
    fn advertise_loop(&mut self) {
        while let Some(state) = self.mailbox.wait_and_take() {
            self.enter(Phase::Advertising);
            self.advertise(state);
            self.enter(Phase::Idle);
        }
    }

    fn advertise(&mut self, state: PlaybackState) {
        let status = TransportStatus::from(state);
        if let Err(e) = self.session.set_playback_status(status) {
            warn!("Dropping advertisement of {status}: {e}");
            return;
        }

        if !state.has_started() || !self.mailbox.try_mark_metadata_advertised() {
            return;
        }

        let Some(input) = self.active.current() else {
            debug!("No active track to advertise");
            self.mailbox.retract_metadata_advertised();
            return;
        };

        let metadata = TrackMetadata::new(
            input.title(),
            input.artist(),
            &self.display.unknown_title,
            &self.display.unknown_artist,
        );
        drop(input);

        let update = DisplayUpdate::track(metadata, self.artwork.clone());
        match self.session.update_display(&update) {
            Ok(()) => debug!(
                "Advertised {} - {}",
                update.artist.as_deref().unwrap_or_default(),
                update.title.as_deref().unwrap_or_default()
            ),
            Err(e) => {
                warn!("Failed to advertise metadata: {e}");
                self.mailbox.retract_metadata_advertised();
            }
        }
    }

    fn shutdown(mut self) {
        self.enter(Phase::ShuttingDown);
        if let Err(e) = self.session.set_enabled(false) {
            warn!("Failed to disable transport controls: {e}");
        }
        info!("Transport controls released");
    }
}
