use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig};
use tracing::debug;

use super::{ButtonHandler, DisplayUpdate, TransportSession};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::models::{Button, TransportStatus};

/// OS transport controls through souvlaki: SMTC on Windows, MPRIS on Linux,
/// MPNowPlayingInfoCenter on macOS.
pub struct PlatformSession {
    controls: MediaControls,
    // Dropped after `controls`, which stay bound to it.
    #[cfg(target_os = "windows")]
    _window: window::HiddenWindow,
    // Read by the button thread to resolve play/pause toggles.
    playing: Arc<AtomicBool>,
    enabled: bool,
    status: TransportStatus,
    title: Option<String>,
    artist: Option<String>,
    cover_url: Option<String>,
}

impl PlatformSession {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        // souvlaki connects to the bus on a service thread of its own and
        // panics there if it cannot, so reachability is checked up front.
        #[cfg(target_os = "linux")]
        check_session_bus(None)?;

        #[cfg(target_os = "windows")]
        let window = window::HiddenWindow::create(&config.display_name)?;
        #[cfg(target_os = "windows")]
        let hwnd = Some(window.handle());
        #[cfg(not(target_os = "windows"))]
        let hwnd = None;

        let platform = PlatformConfig {
            dbus_name: &config.dbus_name,
            display_name: &config.display_name,
            hwnd,
        };

        let controls = MediaControls::new(platform)
            .map_err(|e| SessionError::Unavailable(format!("{e:?}")))?;

        Ok(Self {
            controls,
            #[cfg(target_os = "windows")]
            _window: window,
            playing: Arc::new(AtomicBool::new(false)),
            enabled: false,
            status: TransportStatus::Closed,
            title: None,
            artist: None,
            cover_url: None,
        })
    }

    fn push_playback(&mut self) -> Result<(), SessionError> {
        let playback = if self.enabled {
            to_playback(self.status)
        } else {
            MediaPlayback::Stopped
        };
        self.controls
            .set_playback(playback)
            .map_err(|e| SessionError::Rejected(format!("{e:?}")))
    }

    fn push_metadata(&mut self) -> Result<(), SessionError> {
        if !self.enabled {
            return Ok(());
        }
        self.controls
            .set_metadata(MediaMetadata {
                title: self.title.as_deref(),
                artist: self.artist.as_deref(),
                cover_url: self.cover_url.as_deref(),
                ..Default::default()
            })
            .map_err(|e| SessionError::Rejected(format!("{e:?}")))
    }
}

impl TransportSession for PlatformSession {
    fn subscribe_buttons(&mut self, handler: ButtonHandler) -> Result<(), SessionError> {
        let playing = Arc::clone(&self.playing);
        self.controls
            .attach(move |event: MediaControlEvent| {
                match to_button(&event, playing.load(Ordering::Acquire)) {
                    Some(button) => handler(button),
                    None => debug!("Ignoring media control event {event:?}"),
                }
            })
            .map_err(|e| SessionError::Unavailable(format!("{e:?}")))
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.enabled = enabled;
        self.push_playback()?;
        self.push_metadata()
    }

    fn set_playback_status(&mut self, status: TransportStatus) -> Result<(), SessionError> {
        self.status = status;
        self.playing
            .store(status == TransportStatus::Playing, Ordering::Release);
        if !self.enabled {
            return Ok(());
        }
        self.push_playback()
    }

    fn update_display(&mut self, update: &DisplayUpdate) -> Result<(), SessionError> {
        if let Some(title) = &update.title {
            self.title = Some(title.clone());
        }
        if let Some(artist) = &update.artist {
            self.artist = Some(artist.clone());
        }
        if let Some(thumbnail) = &update.thumbnail {
            self.cover_url = Some(thumbnail.uri.clone());
        }
        self.push_metadata()
    }
}

/// Connect to the session bus at `address`, or the one named by the
/// environment when `None`.
#[cfg(target_os = "linux")]
fn check_session_bus(address: Option<&str>) -> Result<(), SessionError> {
    let connection = match address {
        Some(address) => zbus::blocking::connection::Builder::address(address)
            .and_then(|builder| builder.build()),
        None => zbus::blocking::Connection::session(),
    };
    connection
        .map(drop)
        .map_err(|e| SessionError::Unavailable(format!("session bus: {e}")))
}

#[cfg(target_os = "windows")]
mod window {
    use std::ffi::c_void;

    use tracing::debug;
    use windows::Win32::Foundation::{
        ERROR_CLASS_ALREADY_EXISTS, GetLastError, HWND, LPARAM, LRESULT, WPARAM,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DestroyWindow, RegisterClassW,
        WINDOW_EX_STYLE, WNDCLASSW, WS_OVERLAPPEDWINDOW,
    };
    use windows::core::{HSTRING, w};

    use crate::error::SessionError;

    unsafe extern "system" fn wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
    }

    /// Never-shown window for SMTC to bind to. A console process has none.
    pub struct HiddenWindow {
        hwnd: HWND,
    }

    impl HiddenWindow {
        pub fn create(title: &str) -> Result<Self, SessionError> {
            let class_name = w!("NowPlayingBridgeSession");
            let wc = WNDCLASSW {
                lpfnWndProc: Some(wnd_proc),
                lpszClassName: class_name,
                ..Default::default()
            };

            // SAFETY: `wc` points at a static class name and a valid window
            // procedure; the window is destroyed on drop.
            unsafe {
                if RegisterClassW(&wc) == 0 {
                    let error = GetLastError();
                    if error != ERROR_CLASS_ALREADY_EXISTS {
                        return Err(SessionError::Unavailable(format!(
                            "register window class: {error:?}"
                        )));
                    }
                    debug!("Session window class already registered");
                }

                let hwnd = CreateWindowExW(
                    WINDOW_EX_STYLE::default(),
                    class_name,
                    &HSTRING::from(title),
                    WS_OVERLAPPEDWINDOW,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    None,
                    None,
                    None,
                    None,
                )
                .map_err(|e| SessionError::Unavailable(format!("create window: {e}")))?;

                if hwnd.is_invalid() {
                    return Err(SessionError::Unavailable(
                        "create window: null handle".to_string(),
                    ));
                }
                Ok(Self { hwnd })
            }
        }

        pub fn handle(&self) -> *mut c_void {
            self.hwnd.0
        }
    }

    impl Drop for HiddenWindow {
        fn drop(&mut self) {
            // SAFETY: the handle was created by `create` on this thread.
            if let Err(e) = unsafe { DestroyWindow(self.hwnd) } {
                debug!("Failed to destroy session window: {e}");
            }
        }
    }
}

// souvlaki has no buffering or closed state.
fn to_playback(status: TransportStatus) -> MediaPlayback {
    match status {
        TransportStatus::Playing => MediaPlayback::Playing { progress: None },
        TransportStatus::Paused | TransportStatus::Changing => {
            MediaPlayback::Paused { progress: None }
        }
        TransportStatus::Stopped | TransportStatus::Closed => MediaPlayback::Stopped,
    }
}

fn to_button(event: &MediaControlEvent, playing: bool) -> Option<Button> {
    match event {
        MediaControlEvent::Play => Some(Button::Play),
        MediaControlEvent::Pause => Some(Button::Pause),
        MediaControlEvent::Toggle if playing => Some(Button::Pause),
        MediaControlEvent::Toggle => Some(Button::Play),
        MediaControlEvent::Stop => Some(Button::Stop),
        MediaControlEvent::Next => Some(Button::Next),
        MediaControlEvent::Previous => Some(Button::Previous),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_follows_published_status() {
        assert_eq!(
            to_button(&MediaControlEvent::Toggle, true),
            Some(Button::Pause)
        );
        assert_eq!(
            to_button(&MediaControlEvent::Toggle, false),
            Some(Button::Play)
        );
    }

    #[test]
    fn test_transport_events_map_to_buttons() {
        assert_eq!(to_button(&MediaControlEvent::Play, true), Some(Button::Play));
        assert_eq!(to_button(&MediaControlEvent::Stop, false), Some(Button::Stop));
        assert_eq!(to_button(&MediaControlEvent::Next, false), Some(Button::Next));
        assert_eq!(
            to_button(&MediaControlEvent::Previous, false),
            Some(Button::Previous)
        );
        assert_eq!(to_button(&MediaControlEvent::Raise, false), None);
        assert_eq!(to_button(&MediaControlEvent::Quit, false), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unreachable_session_bus_is_unavailable() {
        let result = check_session_bus(Some("unix:path=/nonexistent/nowplaying-bridge/bus"));
        assert!(matches!(result, Err(SessionError::Unavailable(_))));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_hidden_window_gives_handle() {
        let first = window::HiddenWindow::create("Now Playing Bridge").unwrap();
        assert!(!first.handle().is_null());
        // The class is registered once per process.
        let second = window::HiddenWindow::create("Now Playing Bridge").unwrap();
        assert_ne!(first.handle(), second.handle());
    }

    #[test]
    fn test_status_to_playback() {
        assert!(matches!(
            to_playback(TransportStatus::Playing),
            MediaPlayback::Playing { progress: None }
        ));
        assert!(matches!(
            to_playback(TransportStatus::Changing),
            MediaPlayback::Paused { progress: None }
        ));
        assert!(matches!(
            to_playback(TransportStatus::Closed),
            MediaPlayback::Stopped
        ));
    }
}
