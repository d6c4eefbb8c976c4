use tracing::debug;

use super::{ButtonHandler, DisplayUpdate, TransportSession};
use crate::error::SessionError;
use crate::models::TransportStatus;

/// Session for hosts without transport controls. Accepts everything.
#[derive(Default)]
pub struct NullSession {
    _handler: Option<ButtonHandler>,
}

impl TransportSession for NullSession {
    fn subscribe_buttons(&mut self, handler: ButtonHandler) -> Result<(), SessionError> {
        self._handler = Some(handler);
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        debug!("Transport controls enabled: {enabled}");
        Ok(())
    }

    fn set_playback_status(&mut self, status: TransportStatus) -> Result<(), SessionError> {
        debug!("Transport status: {status}");
        Ok(())
    }

    fn update_display(&mut self, update: &DisplayUpdate) -> Result<(), SessionError> {
        debug!(
            "Transport display: {} - {}",
            update.artist.as_deref().unwrap_or("-"),
            update.title.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}
