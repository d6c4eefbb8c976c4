use anyhow::{Context, Result, anyhow, bail};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use tracing::warn;

use crate::bridge::Bridge;
use crate::config::{Backend, Config};
use crate::error::SessionError;
use crate::models::Button;
use crate::player::local::LocalPlayer;
use crate::session;

pub struct App {
    pub config: Config,
}

impl App {
    pub fn new(backend: Option<Backend>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(backend) = backend {
            config.session.backend = backend;
        }
        Ok(Self { config })
    }

    pub fn play(&self, files: &[PathBuf]) -> Result<()> {
        for file in files {
            if !file.exists() {
                bail!("Audio file not found: {}", file.display());
            }
        }

        let player = LocalPlayer::new(files.to_vec(), self.config.playback.default_volume)?;
        let playlist = player.playlist();

        let bridge = match Bridge::open(
            playlist.clone(),
            session::factory(&self.config.session),
            self.config.display.clone(),
        ) {
            Ok(bridge) => Some(bridge),
            Err(e) => {
                warn!("{:#}", anyhow::Error::from(e));
                println!("Transport controls unavailable; playing without them.");
                None
            }
        };

        playlist.lock().play();
        println!("Commands: play, pause, stop, next, prev, quit");

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.with_context(|| "Failed to read command")?;
            match line.trim() {
                "" => continue,
                "play" => playlist.lock().play(),
                "pause" => playlist.lock().pause(),
                "stop" => playlist.lock().stop(),
                "next" => playlist.lock().next(),
                "prev" => playlist.lock().previous(),
                "quit" | "q" => break,
                other => println!("Unknown command: {other}"),
            }
        }

        if let Some(bridge) = bridge {
            bridge.close();
        }
        player.shutdown();

        Ok(())
    }

    pub fn check(&self) -> Result<()> {
        let backend = self.config.session.backend;
        let factory = session::factory(&self.config.session);

        // Sessions are bound to the thread that creates them.
        let probe = thread::spawn(move || -> Result<(), SessionError> {
            let mut session = factory()?;
            session.subscribe_buttons(Box::new(|_: Button| {}))
        });
        let result = probe
            .join()
            .map_err(|_| anyhow!("Transport controls probe panicked"))?;

        match result {
            Ok(()) => println!("Transport controls available ({backend})"),
            Err(e) => println!("Transport controls unavailable ({backend}): {e}"),
        }

        Ok(())
    }

    pub fn config(&self, init: bool) -> Result<()> {
        let path = Config::config_path();

        if init {
            if path.exists() {
                println!("Config already exists: {}", path.display());
            } else {
                Config::default().save()?;
                println!("Wrote default config: {}", path.display());
            }
            return Ok(());
        }

        println!("# {}", path.display());
        print!("{}", self.config.to_toml()?);
        Ok(())
    }
}
