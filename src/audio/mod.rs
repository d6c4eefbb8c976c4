use anyhow::{Context, Result, bail};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default audio device output. Not `Send`: it stays on the thread that
/// opened it.
pub struct AudioOutput {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl AudioOutput {
    pub fn open(volume: u8) -> Result<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().with_context(|| "Failed to open audio output device")?;

        let sink = Sink::try_new(&stream_handle).with_context(|| "Failed to create audio sink")?;

        let output = Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        };
        output.set_volume(volume);
        Ok(output)
    }

    /// Replace whatever is queued with `path` and start playing it.
    pub fn load(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            bail!("Audio file not found: {}", path.display());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

        let source = Decoder::new(BufReader::new(file))
            .with_context(|| format!("Failed to decode audio file: {}", path.display()))?;

        self.sink.clear();
        self.sink.append(source);
        self.sink.play();
        Ok(())
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    pub fn resume(&self) {
        self.sink.play();
    }

    pub fn stop(&self) {
        self.sink.stop();
    }

    pub fn set_volume(&self, volume: u8) {
        self.sink.set_volume(f32::from(volume.min(100)) / 100.0);
    }

    pub fn is_finished(&self) -> bool {
        self.sink.empty() && !self.sink.is_paused()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
