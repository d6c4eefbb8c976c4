/// Lifecycle state of the playing item, as reported by the player core.
///
/// Ordering follows the lifecycle: anything at or after `Playing` has started
/// producing output and therefore has metadata worth advertising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Closed,
    Opening,
    Playing,
    Paused,
    Ended,
    Error,
}

impl PlaybackState {
    pub fn code(self) -> i32 {
        match self {
            PlaybackState::Closed => 0,
            PlaybackState::Opening => 1,
            PlaybackState::Playing => 2,
            PlaybackState::Paused => 3,
            PlaybackState::Ended => 4,
            PlaybackState::Error => 5,
        }
    }

    /// True once the item has started playing (Playing or any later state).
    pub fn has_started(self) -> bool {
        self >= PlaybackState::Playing
    }
}

// Unknown codes collapse to the initial state.
impl From<i32> for PlaybackState {
    fn from(code: i32) -> Self {
        match code {
            1 => PlaybackState::Opening,
            2 => PlaybackState::Playing,
            3 => PlaybackState::Paused,
            4 => PlaybackState::Ended,
            5 => PlaybackState::Error,
            _ => PlaybackState::Closed,
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Closed => write!(f, "closed"),
            PlaybackState::Opening => write!(f, "opening"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Status shown by the OS transport controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportStatus {
    #[default]
    Closed,
    Changing,
    Stopped,
    Playing,
    Paused,
}

impl From<PlaybackState> for TransportStatus {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Opening => TransportStatus::Changing,
            PlaybackState::Playing => TransportStatus::Playing,
            PlaybackState::Paused => TransportStatus::Paused,
            PlaybackState::Ended => TransportStatus::Stopped,
            PlaybackState::Closed | PlaybackState::Error => TransportStatus::default(),
        }
    }
}

impl std::fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportStatus::Closed => write!(f, "closed"),
            TransportStatus::Changing => write!(f, "changing"),
            TransportStatus::Stopped => write!(f, "stopped"),
            TransportStatus::Playing => write!(f, "playing"),
            TransportStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Buttons the OS transport controls can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Play,
    Pause,
    Stop,
    Record,
    FastForward,
    Rewind,
    Next,
    Previous,
    ChannelUp,
    ChannelDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
}

impl TrackMetadata {
    pub fn new(
        title: Option<String>,
        artist: Option<String>,
        unknown_title: &str,
        unknown_artist: &str,
    ) -> Self {
        Self {
            title: title.unwrap_or_else(|| unknown_title.to_string()),
            artist: artist.unwrap_or_else(|| unknown_artist.to_string()),
        }
    }
}

/// Reference to a thumbnail image the OS fetches itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub uri: String,
}

impl Artwork {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PlaybackState; 6] = [
        PlaybackState::Closed,
        PlaybackState::Opening,
        PlaybackState::Playing,
        PlaybackState::Paused,
        PlaybackState::Ended,
        PlaybackState::Error,
    ];

    #[test]
    fn test_status_mapping_is_total() {
        let mapped: Vec<_> = ALL
            .iter()
            .map(|s| TransportStatus::from(*s))
            .collect();

        assert_eq!(
            mapped,
            vec![
                TransportStatus::Closed,
                TransportStatus::Changing,
                TransportStatus::Playing,
                TransportStatus::Paused,
                TransportStatus::Stopped,
                TransportStatus::Closed,
            ]
        );
    }

    #[test]
    fn test_unknown_codes_map_to_closed() {
        for code in [-1, 6, 42, i32::MAX, i32::MIN] {
            let state = PlaybackState::from(code);
            assert_eq!(state, PlaybackState::Closed);
            assert_eq!(TransportStatus::from(state), TransportStatus::Closed);
        }
        assert_eq!(
            TransportStatus::from(PlaybackState::default()),
            TransportStatus::Closed
        );
    }

    #[test]
    fn test_codes_are_stable() {
        for state in ALL {
            assert_eq!(PlaybackState::from(state.code()), state);
        }
    }

    #[test]
    fn test_has_started() {
        assert!(!PlaybackState::Closed.has_started());
        assert!(!PlaybackState::Opening.has_started());
        assert!(PlaybackState::Playing.has_started());
        assert!(PlaybackState::Paused.has_started());
        assert!(PlaybackState::Ended.has_started());
        assert!(PlaybackState::Error.has_started());
    }

    #[test]
    fn test_metadata_placeholders() {
        let meta = TrackMetadata::new(None, None, "Unknown Title", "Unknown Artist");
        assert_eq!(meta.title, "Unknown Title");
        assert_eq!(meta.artist, "Unknown Artist");

        let meta = TrackMetadata::new(
            Some("Song A".to_string()),
            None,
            "Unknown Title",
            "Unknown Artist",
        );
        assert_eq!(meta.title, "Song A");
        assert_eq!(meta.artist, "Unknown Artist");
    }
}
