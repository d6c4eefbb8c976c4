//! Fakes for the player core and the transport session.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::SessionError;
use crate::models::{Button, PlaybackState, TransportStatus};
use crate::player::{
    CurrentListener, Input, InputEvent, InputListener, ListenerId, ListenerSet, Playlist,
    PlaylistCommands,
};
use crate::session::{ButtonHandler, DisplayUpdate, SessionFactory, TransportSession};

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub struct FakeInput {
    title: Option<String>,
    artist: Option<String>,
    state: AtomicI32,
    listeners: ListenerSet<dyn Fn(InputEvent) + Send + Sync>,
}

impl FakeInput {
    pub fn new(title: Option<&str>, artist: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            title: title.map(str::to_string),
            artist: artist.map(str::to_string),
            state: AtomicI32::new(PlaybackState::Closed.code()),
            listeners: ListenerSet::default(),
        })
    }

    pub fn handle(self: &Arc<Self>) -> Arc<dyn Input> {
        Arc::clone(self) as Arc<dyn Input>
    }

    pub fn emit_state(&self, state: PlaybackState) {
        self.state.store(state.code(), Ordering::SeqCst);
        for listener in self.listeners.snapshot() {
            listener(InputEvent::StateChanged(state));
        }
    }

    pub fn kill(&self) {
        for listener in self.listeners.snapshot() {
            listener(InputEvent::Dead);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Input for FakeInput {
    fn state(&self) -> PlaybackState {
        PlaybackState::from(self.state.load(Ordering::SeqCst))
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn artist(&self) -> Option<String> {
        self.artist.clone()
    }

    fn subscribe(&self, listener: InputListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

#[derive(Default)]
pub struct FakePlaylist {
    lock: Mutex<()>,
    locked: AtomicBool,
    lock_count: AtomicUsize,
    commands: Mutex<Vec<(&'static str, bool)>>,
    current: ListenerSet<dyn Fn(Option<Arc<dyn Input>>) + Send + Sync>,
}

impl FakePlaylist {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Commands issued so far, each paired with whether the lock was held.
    pub fn commands(&self) -> Vec<(&'static str, bool)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::SeqCst)
    }

    pub fn set_current(&self, input: Option<Arc<dyn Input>>) {
        for listener in self.current.snapshot() {
            listener(input.clone());
        }
    }

    pub fn current_listener_count(&self) -> usize {
        self.current.len()
    }
}

struct FakeGuard<'a> {
    playlist: &'a FakePlaylist,
    _guard: MutexGuard<'a, ()>,
}

impl FakeGuard<'_> {
    fn record(&self, name: &'static str) {
        let locked = self.playlist.is_locked();
        self.playlist.commands.lock().unwrap().push((name, locked));
    }
}

impl Drop for FakeGuard<'_> {
    fn drop(&mut self) {
        self.playlist.locked.store(false, Ordering::SeqCst);
    }
}

impl PlaylistCommands for FakeGuard<'_> {
    fn play(&mut self) {
        self.record("play");
    }

    fn pause(&mut self) {
        self.record("pause");
    }

    fn stop(&mut self) {
        self.record("stop");
    }

    fn next(&mut self) {
        self.record("next");
    }

    fn previous(&mut self) {
        self.record("previous");
    }
}

impl Playlist for FakePlaylist {
    fn lock(&self) -> Box<dyn PlaylistCommands + '_> {
        let guard = self.lock.lock().unwrap();
        self.locked.store(true, Ordering::SeqCst);
        self.lock_count.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeGuard {
            playlist: self,
            _guard: guard,
        })
    }

    fn subscribe_current(&self, listener: CurrentListener) -> ListenerId {
        self.current.add(listener)
    }

    fn unsubscribe_current(&self, id: ListenerId) {
        self.current.remove(id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Subscribe,
    Enabled(bool),
    Status(TransportStatus),
    Display(DisplayUpdate),
}

/// Shared view into a `RecordingSession` living on the advertiser thread.
#[derive(Default)]
pub struct SessionProbe {
    calls: Mutex<Vec<SessionCall>>,
    buttons: Mutex<Option<ButtonHandler>>,
    fail_status: AtomicBool,
    fail_display: AtomicBool,
    dropped: AtomicBool,
}

impl SessionProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn factory(self: &Arc<Self>) -> SessionFactory {
        let probe = Arc::clone(self);
        Box::new(move || {
            Ok::<_, SessionError>(
                Box::new(RecordingSession { probe, gate: None }) as Box<dyn TransportSession>
            )
        })
    }

    /// Publishing `status` blocks: `entered` fires, then the session waits on
    /// `release` before recording the call.
    pub fn gated_factory(
        self: &Arc<Self>,
        status: TransportStatus,
        entered: Sender<()>,
        release: Receiver<()>,
    ) -> SessionFactory {
        let probe = Arc::clone(self);
        Box::new(move || {
            Ok::<_, SessionError>(Box::new(RecordingSession {
                probe,
                gate: Some(Gate {
                    status,
                    entered,
                    release,
                }),
            }) as Box<dyn TransportSession>)
        })
    }

    pub fn unavailable_factory() -> SessionFactory {
        Box::new(|| {
            Err::<Box<dyn TransportSession>, _>(SessionError::Unavailable(
                "no session bus".to_string(),
            ))
        })
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<TransportStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SessionCall::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Display commits that carried track metadata.
    pub fn track_displays(&self) -> Vec<DisplayUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SessionCall::Display(update) if update.title.is_some() => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn press(&self, button: Button) {
        if let Some(handler) = self.buttons.lock().unwrap().as_ref() {
            handler(button);
        }
    }

    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub fn fail_display(&self, fail: bool) {
        self.fail_display.store(fail, Ordering::SeqCst);
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }
}

struct Gate {
    status: TransportStatus,
    entered: Sender<()>,
    release: Receiver<()>,
}

pub struct RecordingSession {
    probe: Arc<SessionProbe>,
    gate: Option<Gate>,
}

impl TransportSession for RecordingSession {
    fn subscribe_buttons(&mut self, handler: ButtonHandler) -> Result<(), SessionError> {
        *self.probe.buttons.lock().unwrap() = Some(handler);
        self.probe.record(SessionCall::Subscribe);
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.probe.record(SessionCall::Enabled(enabled));
        Ok(())
    }

    fn set_playback_status(&mut self, status: TransportStatus) -> Result<(), SessionError> {
        if let Some(gate) = self.gate.as_ref().filter(|gate| gate.status == status) {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
        if self.probe.fail_status.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected("status".to_string()));
        }
        self.probe.record(SessionCall::Status(status));
        Ok(())
    }

    fn update_display(&mut self, update: &DisplayUpdate) -> Result<(), SessionError> {
        if self.probe.fail_display.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected("display".to_string()));
        }
        self.probe.record(SessionCall::Display(update.clone()));
        Ok(())
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // Release the button handler so it does not outlive the session.
        self.probe.buttons.lock().unwrap().take();
        self.probe.dropped.store(true, Ordering::SeqCst);
    }
}
