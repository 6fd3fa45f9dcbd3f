use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info};

/// Something that can start playing a track by file name
pub trait PlaybackSink: Send + Sync {
    fn play_track(&self, file_name: &str) -> Result<()>;
}

/// Hands the track to an external player program.
///
/// At most one player process is alive: starting a track stops and reaps the
/// previous one.
#[derive(Debug)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    music_dir: PathBuf,
    current: Mutex<Option<Child>>,
}

impl CommandPlayer {
    /// `command` is split on whitespace; the track path is appended last
    pub fn new(command: &str, music_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("Player command is empty"))?;

        Ok(Self {
            program,
            args: parts.collect(),
            music_dir: music_dir.into(),
            current: Mutex::new(None),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Pid of the running player, if one is still alive
    pub fn current_pid(&self) -> Option<u32> {
        let mut current = self.current.lock().ok()?;
        let child = current.as_mut()?;
        match child.try_wait() {
            Ok(None) => Some(child.id()),
            _ => None,
        }
    }

    /// Stop whatever is playing
    pub fn stop(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(mut child) = current.take() {
                stop_child(&mut child);
            }
        }
    }
}

fn stop_child(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill() {
        debug!("Failed to kill player {}: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        debug!("Failed to reap player {}: {}", child.id(), e);
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl PlaybackSink for CommandPlayer {
    fn play_track(&self, file_name: &str) -> Result<()> {
        let path = self.music_dir.join(file_name);
        if !path.exists() {
            return Err(anyhow!("Track not found: {}", path.display()));
        }

        let mut current = self
            .current
            .lock()
            .map_err(|_| anyhow!("Player state lock poisoned"))?;
        if let Some(mut previous) = current.take() {
            stop_child(&mut previous);
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start player '{}'", self.program))?;
        *current = Some(child);

        info!(track = file_name, player = %self.program, "Started playback");
        Ok(())
    }
}

/// Logs playback requests without playing anything
#[derive(Debug, Clone, Default)]
pub struct NullPlayer;

impl PlaybackSink for NullPlayer {
    fn play_track(&self, file_name: &str) -> Result<()> {
        info!(track = file_name, "Playback requested (no player configured)");
        Ok(())
    }
}
