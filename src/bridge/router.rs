use std::sync::Arc;

use tracing::{debug, trace};

use crate::models::Button;
use crate::player::Playlist;
use crate::session::ButtonHandler;

/// Turns transport-control button presses into playlist commands. Runs on
/// the session backend's event thread.
#[derive(Clone)]
pub struct CommandRouter {
    playlist: Arc<dyn Playlist>,
}

impl CommandRouter {
    pub fn new(playlist: Arc<dyn Playlist>) -> Self {
        Self { playlist }
    }

    pub fn dispatch(&self, button: Button) {
        let routed = matches!(
            button,
            Button::Play | Button::Pause | Button::Stop | Button::Next | Button::Previous
        );
        if !routed {
            trace!("Ignoring {button:?} button");
            return;
        }

        debug!("Transport button {button:?}");
        let mut playlist = self.playlist.lock();
        match button {
            Button::Play => playlist.play(),
            Button::Pause => playlist.pause(),
            Button::Stop => playlist.stop(),
            Button::Next => playlist.next(),
            Button::Previous => playlist.previous(),
            _ => {}
        }
    }

    pub fn into_handler(self) -> ButtonHandler {
        Box::new(move |button| self.dispatch(button))
    }
}
