//! Local file player used to host the bridge from the command line.
//!
//! The audio output lives on one audio thread fed by a command channel, and
//! every state change is raised from that thread. A monitor thread watches
//! for the end of the current file and advances the queue.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    CurrentListener, Input, InputEvent, InputListener, ListenerId, ListenerSet, Playlist,
    PlaylistCommands,
};
use crate::audio::AudioOutput;
use crate::models::PlaybackState;

const MONITOR_INTERVAL: Duration = Duration::from_millis(500);
const AUDIO_POLL: Duration = Duration::from_millis(100);

/// One queued file while it is the active item.
pub struct LocalInput {
    id: Uuid,
    path: PathBuf,
    name: Option<String>,
    state: AtomicI32,
    listeners: ListenerSet<dyn Fn(InputEvent) + Send + Sync>,
}

impl LocalInput {
    fn new(path: &Path) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned()),
            state: AtomicI32::new(PlaybackState::Closed.code()),
            listeners: ListenerSet::default(),
        })
    }

    fn set_state(&self, state: PlaybackState) {
        self.state.store(state.code(), Ordering::SeqCst);
        debug!("Input {} is {state}", self.id);
        for listener in self.listeners.snapshot() {
            listener(InputEvent::StateChanged(state));
        }
    }

    fn kill(&self) {
        debug!("Input {} destroyed", self.id);
        for listener in self.listeners.snapshot() {
            listener(InputEvent::Dead);
        }
    }
}

impl Input for LocalInput {
    fn state(&self) -> PlaybackState {
        PlaybackState::from(self.state.load(Ordering::SeqCst))
    }

    // No tag reader: the file name stands in for the title.
    fn title(&self) -> Option<String> {
        self.name.clone()
    }

    fn artist(&self) -> Option<String> {
        None
    }

    fn subscribe(&self, listener: InputListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

// Internal commands for the audio thread
enum AudioCommand {
    Load(Arc<LocalInput>),
    Pause(Arc<LocalInput>),
    Resume(Arc<LocalInput>),
    /// Stop output, then end and destroy the input.
    Stop(Arc<LocalInput>),
    CheckFinished(Sender<bool>),
}

struct Queue {
    files: Vec<PathBuf>,
    index: usize,
    current: Option<Arc<LocalInput>>,
}

pub struct LocalPlaylist {
    queue: Mutex<Queue>,
    audio_tx: Sender<AudioCommand>,
    current_listeners: ListenerSet<dyn Fn(Option<Arc<dyn Input>>) + Send + Sync>,
}

impl LocalPlaylist {
    fn new(files: Vec<PathBuf>, audio_tx: Sender<AudioCommand>) -> Self {
        Self {
            queue: Mutex::new(Queue {
                files,
                index: 0,
                current: None,
            }),
            audio_tx,
            current_listeners: ListenerSet::default(),
        }
    }

    fn guard(&self) -> QueueGuard<'_> {
        QueueGuard {
            queue: self.queue.lock().unwrap_or_else(PoisonError::into_inner),
            playlist: self,
        }
    }

    fn send(&self, command: AudioCommand) {
        if self.audio_tx.send(command).is_err() {
            error!("Audio thread not running");
        }
    }

    fn announce(&self, input: Option<Arc<LocalInput>>) {
        let input = input.map(|input| input as Arc<dyn Input>);
        for listener in self.current_listeners.snapshot() {
            listener(input.clone());
        }
    }
}

/// The playlist lock. Commands only exist on the guard.
struct QueueGuard<'a> {
    queue: MutexGuard<'a, Queue>,
    playlist: &'a LocalPlaylist,
}

impl QueueGuard<'_> {
    fn start(&mut self, index: usize) {
        let Some(path) = self.queue.files.get(index).cloned() else {
            return;
        };

        if let Some(previous) = self.queue.current.take() {
            self.playlist.send(AudioCommand::Stop(previous));
        }

        let input = LocalInput::new(&path);
        info!("Now playing: {}", path.display());
        self.queue.index = index;
        self.queue.current = Some(Arc::clone(&input));
        self.playlist.announce(Some(Arc::clone(&input)));
        self.playlist.send(AudioCommand::Load(input));
    }

    /// Advance past `finished` if it is still the active item.
    fn finish(&mut self, finished: &Arc<LocalInput>) {
        let still_current = self
            .queue
            .current
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, finished));
        if still_current {
            self.next();
        }
    }
}

impl PlaylistCommands for QueueGuard<'_> {
    fn play(&mut self) {
        let state = self.queue.current.as_ref().map(|current| current.state());
        match state {
            Some(PlaybackState::Paused) => {
                if let Some(current) = self.queue.current.clone() {
                    self.playlist.send(AudioCommand::Resume(current));
                }
            }
            Some(PlaybackState::Opening | PlaybackState::Playing) => {}
            _ => {
                let index = self.queue.index;
                self.start(index);
            }
        }
    }

    fn pause(&mut self) {
        if let Some(current) = self.queue.current.as_ref() {
            if current.state() == PlaybackState::Playing {
                self.playlist.send(AudioCommand::Pause(Arc::clone(current)));
            }
        }
    }

    fn stop(&mut self) {
        if let Some(current) = self.queue.current.take() {
            self.playlist.send(AudioCommand::Stop(current));
            self.playlist.announce(None);
        }
    }

    fn next(&mut self) {
        let next = self.queue.index + 1;
        if next < self.queue.files.len() {
            self.start(next);
        } else {
            info!("End of queue");
            self.stop();
        }
    }

    fn previous(&mut self) {
        let previous = self.queue.index.saturating_sub(1);
        self.start(previous);
    }
}

impl Playlist for LocalPlaylist {
    fn lock(&self) -> Box<dyn PlaylistCommands + '_> {
        Box::new(self.guard())
    }

    fn subscribe_current(&self, listener: CurrentListener) -> ListenerId {
        self.current_listeners.add(listener)
    }

    fn unsubscribe_current(&self, id: ListenerId) {
        self.current_listeners.remove(id);
    }
}

pub struct LocalPlayer {
    playlist: Arc<LocalPlaylist>,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl LocalPlayer {
    pub fn new(files: Vec<PathBuf>, volume: u8) -> Result<Self> {
        let (audio_tx, audio_rx) = mpsc::channel();
        let playlist = Arc::new(LocalPlaylist::new(files, audio_tx));
        let running = Arc::new(AtomicBool::new(true));

        // AudioOutput stays on this single thread
        let audio_running = Arc::clone(&running);
        let audio = thread::Builder::new()
            .name("player-audio".to_string())
            .spawn(move || run_audio_thread(audio_rx, audio_running, volume))
            .with_context(|| "Failed to spawn audio thread")?;

        let monitor_playlist = Arc::clone(&playlist);
        let monitor_running = Arc::clone(&running);
        let monitor = thread::Builder::new()
            .name("player-monitor".to_string())
            .spawn(move || playback_monitor(monitor_playlist, monitor_running))
            .with_context(|| "Failed to spawn playback monitor")?;

        Ok(Self {
            playlist,
            running,
            threads: vec![audio, monitor],
        })
    }

    pub fn playlist(&self) -> Arc<dyn Playlist> {
        Arc::clone(&self.playlist) as Arc<dyn Playlist>
    }

    pub fn shutdown(mut self) {
        self.stop_threads();
    }

    fn stop_threads(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        self.playlist.guard().stop();
        self.running.store(false, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        info!("Player stopped");
    }
}

impl Drop for LocalPlayer {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

fn run_audio_thread(rx: Receiver<AudioCommand>, running: Arc<AtomicBool>, volume: u8) {
    let output = match AudioOutput::open(volume) {
        Ok(output) => Some(output),
        Err(e) => {
            error!("Failed to initialize audio output: {e:#}");
            None
        }
    };

    loop {
        match rx.recv_timeout(AUDIO_POLL) {
            Ok(command) => handle_audio_command(output.as_ref(), command),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn handle_audio_command(output: Option<&AudioOutput>, command: AudioCommand) {
    match command {
        AudioCommand::Load(input) => {
            input.set_state(PlaybackState::Opening);
            let loaded = match output {
                Some(output) => output.load(&input.path),
                None => Err(anyhow::anyhow!("No audio output")),
            };
            match loaded {
                Ok(()) => input.set_state(PlaybackState::Playing),
                Err(e) => {
                    error!("Failed to play: {e:#}");
                    input.set_state(PlaybackState::Error);
                }
            }
        }
        AudioCommand::Pause(input) => {
            if let Some(output) = output {
                output.pause();
            }
            input.set_state(PlaybackState::Paused);
        }
        AudioCommand::Resume(input) => {
            if let Some(output) = output {
                output.resume();
            }
            input.set_state(PlaybackState::Playing);
        }
        AudioCommand::Stop(input) => {
            if let Some(output) = output {
                output.stop();
            }
            input.set_state(PlaybackState::Ended);
            input.kill();
        }
        AudioCommand::CheckFinished(response_tx) => {
            let finished = output.is_some_and(AudioOutput::is_finished);
            let _ = response_tx.send(finished);
        }
    }
}

fn playback_monitor(playlist: Arc<LocalPlaylist>, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        thread::sleep(MONITOR_INTERVAL);

        let playing = {
            let guard = playlist.guard();
            guard
                .queue
                .current
                .as_ref()
                .filter(|current| current.state() == PlaybackState::Playing)
                .cloned()
        };
        let Some(playing) = playing else {
            continue;
        };

        // Check if audio finished
        let (tx, rx) = mpsc::channel();
        playlist.send(AudioCommand::CheckFinished(tx));
        let finished = rx.recv_timeout(AUDIO_POLL).unwrap_or(false);

        if finished {
            playlist.guard().finish(&playing);
        }
    }
}
