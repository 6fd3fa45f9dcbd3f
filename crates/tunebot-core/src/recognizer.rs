//! Lifecycle around a fingerprint-recognition engine
//!
//! The engine itself (audio capture, fingerprinting, the network lookup) is
//! provided by a vendor SDK behind [`RecognitionEngine`]. This module only
//! tracks which calls are legal in which state and reduces the result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RecognizerError;
use crate::recognition::{reduce, RecognitionOutcome};

const LOW_VOLUME_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub host: String,
    pub access_key: String,
    pub access_secret: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub volume_callback: bool,
    pub reserved_buffer_ms: u32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            access_key: String::new(),
            access_secret: String::new(),
            sample_rate: 44100,
            channels: 1,
            volume_callback: true,
            reserved_buffer_ms: 10000,
        }
    }
}

/// Calls into the vendor SDK
pub trait RecognitionEngine {
    fn init(&mut self, config: &RecognizerConfig) -> bool;
    fn start(&mut self) -> bool;
    fn cancel(&mut self);
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerState {
    Uninitialized,
    /// Initialized, no recognition run yet
    Ready,
    Recognizing,
    /// Initialized, last run finished or was cancelled
    Idle,
}

pub struct RecognitionSession<E: RecognitionEngine> {
    engine: E,
    state: RecognizerState,
}

impl<E: RecognitionEngine> RecognitionSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: RecognizerState::Uninitialized,
        }
    }

    pub fn state(&self) -> RecognizerState {
        self.state
    }

    /// Returns whether the engine accepted the configuration
    pub fn init(&mut self, config: &RecognizerConfig) -> bool {
        let ok = self.engine.init(config);
        info!(host = %config.host, ok, "Recognizer init");
        self.state = if ok {
            RecognizerState::Ready
        } else {
            RecognizerState::Uninitialized
        };
        ok
    }

    pub fn start(&mut self) -> Result<(), RecognizerError> {
        match self.state {
            RecognizerState::Uninitialized => Err(RecognizerError::NotInitialized),
            RecognizerState::Recognizing => Err(RecognizerError::AlreadyRecognizing),
            RecognizerState::Ready | RecognizerState::Idle => {
                if self.engine.start() {
                    self.state = RecognizerState::Recognizing;
                    Ok(())
                } else {
                    warn!("Recognition engine refused to start");
                    Err(RecognizerError::StartFailed)
                }
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.state == RecognizerState::Recognizing {
            self.engine.cancel();
            self.state = RecognizerState::Idle;
        }
    }

    /// Result callback from the engine
    pub fn on_result(&mut self, raw: &str) -> RecognitionOutcome {
        if self.state == RecognizerState::Recognizing {
            self.state = RecognizerState::Idle;
        }
        reduce(raw)
    }

    /// Volume callback. Quiet input is reported, never acted on; returns
    /// true when the level is below the warning threshold.
    pub fn on_volume(&self, volume: f64) -> bool {
        debug!(volume, "Recognizer volume");
        let too_quiet = volume < LOW_VOLUME_THRESHOLD;
        if too_quiet {
            warn!("Volume too low ({:.2}), recognition may fail", volume);
        }
        too_quiet
    }

    pub fn release(&mut self) {
        if self.state != RecognizerState::Uninitialized {
            self.engine.release();
            self.state = RecognizerState::Uninitialized;
        }
    }
}

impl<E: RecognitionEngine> Drop for RecognitionSession<E> {
    fn drop(&mut self) {
        self.release();
    }
}
