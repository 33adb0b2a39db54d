//! Local speech synthesis - the fallback output path
//!
//! When remote TTS fails, text is spoken through a local engine. On macOS
//! that is `say`; elsewhere `espeak-ng`/`espeak` if installed. Detection
//! happens once; absence makes the fallback a silent no-op.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{Error, Result};

/// Baseline speaking rate in words per minute (rate 1.0)
const BASE_WPM: f32 = 175.0;

/// Events delivered by a synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    /// The engine started speaking
    Started,
    /// The engine finished (or was cancelled)
    Ended,
}

/// Handler invoked for each synthesis event
pub type OutputHandler = Box<dyn FnMut(OutputEvent) + Send>;

/// One utterance handed to a local engine
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// Selected voice name, or `None` for the engine default
    pub voice: Option<String>,
    /// Pitch multiplier (1.0 = engine default)
    pub pitch: f32,
    /// Rate multiplier (1.0 = engine default)
    pub rate: f32,
}

/// A local text-to-speech capability
pub trait SpeechOutput: Send {
    /// Register the event handler. Called once, before any [`speak`].
    ///
    /// [`speak`]: SpeechOutput::speak
    fn set_event_handler(&mut self, handler: OutputHandler);

    /// Voice names the engine offers
    fn voices(&self) -> Vec<String>;

    /// Speak one utterance, replacing any in progress
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be started.
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;

    /// Stop speaking immediately
    fn cancel(&mut self);
}

/// Pick a voice by preference order
///
/// The first preference with a substring match among `voices` wins; `None`
/// means the engine default should be used.
#[must_use]
pub fn select_voice(voices: &[String], preferences: &[String]) -> Option<String> {
    preferences
        .iter()
        .find_map(|pref| voices.iter().find(|v| v.contains(pref.as_str())).cloned())
}

/// Which local engine was found
#[derive(Debug, Clone)]
enum Engine {
    /// macOS `say`
    Say(PathBuf),
    /// `espeak-ng` or `espeak`
    Espeak(PathBuf),
}

impl Engine {
    fn program(&self) -> &Path {
        match self {
            Self::Say(p) | Self::Espeak(p) => p,
        }
    }

    /// Query the engine for its voice list; empty on failure
    fn list_voices(&self) -> Vec<String> {
        let output = match self {
            Self::Say(p) => Command::new(p).args(["-v", "?"]).output(),
            Self::Espeak(p) => Command::new(p).arg("--voices").output(),
        };

        match output {
            Ok(out) if out.status.success() => {
                let text = String::from_utf8_lossy(&out.stdout);
                match self {
                    Self::Say(_) => parse_say_voices(&text),
                    Self::Espeak(_) => parse_espeak_voices(&text),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Build the command that speaks `utterance`
    fn command(&self, utterance: &Utterance) -> Command {
        match self {
            Self::Say(p) => {
                let mut cmd = Command::new(p);
                if let Some(voice) = &utterance.voice {
                    cmd.args(["-v", voice]);
                }
                // `say` has no pitch flag; voice and rate only
                cmd.args(["-r", &words_per_minute(utterance.rate).to_string()]);
                cmd.arg(&utterance.text);
                cmd
            }
            Self::Espeak(p) => {
                let mut cmd = Command::new(p);
                if let Some(voice) = &utterance.voice {
                    cmd.args(["-v", voice]);
                }
                cmd.args(["-p", &espeak_pitch(utterance.pitch).to_string()]);
                cmd.args(["-s", &words_per_minute(utterance.rate).to_string()]);
                cmd.arg(&utterance.text);
                cmd
            }
        }
    }
}

/// Map a rate multiplier to words per minute
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn words_per_minute(rate: f32) -> u32 {
    (BASE_WPM * rate).clamp(80.0, 450.0).round() as u32
}

/// Map a pitch multiplier to espeak's 0-99 scale (50 = default)
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn espeak_pitch(pitch: f32) -> u32 {
    (50.0 * pitch).clamp(0.0, 99.0).round() as u32
}

/// Parse `say -v ?` output: voice name (may contain spaces), locale, sample
fn parse_say_voices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split("  ").next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parse `espeak --voices` output: the VoiceName column
fn parse_espeak_voices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1) // header row
        .filter_map(|line| line.split_whitespace().nth(3))
        .map(ToString::to_string)
        .collect()
}

/// Speaks through a local command-line engine
pub struct CommandSynthesizer {
    engine: Engine,
    voices: Vec<String>,
    handler: Arc<Mutex<Option<OutputHandler>>>,
    // Slot for the active utterance's child process; each monitor thread is
    // bound to the slot of the utterance it watches
    current: Option<Arc<Mutex<Option<Child>>>>,
}

impl CommandSynthesizer {
    /// Detect a local engine: `say`, then `espeak-ng`, then `espeak`
    #[must_use]
    pub fn detect() -> Option<Self> {
        let engine = which::which("say")
            .map(Engine::Say)
            .or_else(|_| which::which("espeak-ng").map(Engine::Espeak))
            .or_else(|_| which::which("espeak").map(Engine::Espeak))
            .ok()?;

        let voices = engine.list_voices();
        tracing::debug!(
            engine = %engine.program().display(),
            voices = voices.len(),
            "local speech engine detected"
        );

        Some(Self {
            engine,
            voices,
            handler: Arc::new(Mutex::new(None)),
            current: None,
        })
    }

    fn emit(handler: &Arc<Mutex<Option<OutputHandler>>>, event: OutputEvent) {
        if let Ok(mut guard) = handler.lock() {
            if let Some(h) = guard.as_mut() {
                h(event);
            }
        }
    }
}

impl SpeechOutput for CommandSynthesizer {
    fn set_event_handler(&mut self, handler: OutputHandler) {
        if let Ok(mut guard) = self.handler.lock() {
            *guard = Some(handler);
        }
    }

    fn voices(&self) -> Vec<String> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        // One utterance at a time
        self.cancel();

        let mut cmd = self.engine.command(utterance);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| Error::Voice(format!("failed to start speech engine: {e}")))?;

        tracing::debug!(
            engine = %self.engine.program().display(),
            voice = ?utterance.voice,
            "speaking via local engine"
        );

        let slot = Arc::new(Mutex::new(Some(child)));
        self.current = Some(Arc::clone(&slot));

        Self::emit(&self.handler, OutputEvent::Started);

        let handler = Arc::clone(&self.handler);
        std::thread::spawn(move || {
            // Ended is emitted only for a natural exit; a cancelled
            // utterance (empty slot) must not clobber its replacement's state
            let finished = loop {
                {
                    let Ok(mut guard) = slot.lock() else { break false };
                    match guard.as_mut() {
                        None => break false,
                        Some(child) => match child.try_wait() {
                            Ok(Some(_)) | Err(_) => {
                                guard.take();
                                break true;
                            }
                            Ok(None) => {}
                        },
                    }
                }
                std::thread::sleep(Duration::from_millis(50));
            };
            if finished {
                Self::emit(&handler, OutputEvent::Ended);
            }
        });

        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(slot) = self.current.take() {
            if let Ok(mut guard) = slot.lock() {
                if let Some(mut child) = guard.take() {
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }
    }
}
