//! OS transport controls ("now playing" surface).
//!
//! A session is created and driven from a single thread for its whole life.
//! Button presses arrive on a thread owned by the backend.

use crate::config::{Backend, SessionConfig};
use crate::error::SessionError;
use crate::models::{Artwork, Button, TrackMetadata, TransportStatus};

mod null;
mod platform;

pub use null::NullSession;
pub use platform::PlatformSession;

pub type ButtonHandler = Box<dyn Fn(Button) + Send + Sync + 'static>;

/// Builds a session on the thread that will own it.
pub type SessionFactory =
    Box<dyn FnOnce() -> Result<Box<dyn TransportSession>, SessionError> + Send + 'static>;

/// One display-updater commit: staged fields are applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub thumbnail: Option<Artwork>,
}

impl DisplayUpdate {
    pub fn thumbnail(artwork: Artwork) -> Self {
        Self {
            thumbnail: Some(artwork),
            ..Default::default()
        }
    }

    pub fn track(metadata: TrackMetadata, artwork: Artwork) -> Self {
        Self {
            title: Some(metadata.title),
            artist: Some(metadata.artist),
            thumbnail: Some(artwork),
        }
    }
}

pub trait TransportSession {
    /// Register the handler for button presses and advertise the buttons it serves.
    fn subscribe_buttons(&mut self, handler: ButtonHandler) -> Result<(), SessionError>;
    fn set_enabled(&mut self, enabled: bool) -> Result<(), SessionError>;
    fn set_playback_status(&mut self, status: TransportStatus) -> Result<(), SessionError>;
    fn update_display(&mut self, update: &DisplayUpdate) -> Result<(), SessionError>;
}

/// Factory for the backend selected in configuration.
pub fn factory(config: &SessionConfig) -> SessionFactory {
    match config.backend {
        Backend::Platform => {
            let config = config.clone();
            Box::new(move || {
                PlatformSession::new(&config)
                    .map(|session| Box::new(session) as Box<dyn TransportSession>)
            })
        }
        Backend::None => Box::new(|| {
            Ok::<_, SessionError>(Box::new(NullSession::default()) as Box<dyn TransportSession>)
        }),
    }
}
