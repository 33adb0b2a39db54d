//! Voice interaction controller
//!
//! One state machine over two independent capabilities: speech capture
//! (listening) and speech output (speaking). Output prefers remote TTS and
//! falls back to a local engine; neither path lets a failure escape.

use std::sync::{Arc, Mutex};

use crate::client::BackendClient;
use crate::config::VoiceSettings;
use crate::voice::capture::{self, CaptureEvent, SpeechCapture};
use crate::voice::playback::{AudioOutput, CpalPlayer, PlaybackHandle, decode_audio};
use crate::voice::synthesis::{
    CommandSynthesizer, OutputEvent, SpeechOutput, Utterance, select_voice,
};
use crate::{Error, Result};

/// Observable voice state, exposed read-only to the presentation layer
#[derive(Debug, Clone)]
pub struct VoiceState {
    /// A capture session is active
    pub is_listening: bool,
    /// Audio output (remote or local) is active
    pub is_speaking: bool,
    /// Most recently recognized utterance
    pub transcript: String,
    /// Replies should be spoken out loud
    pub voice_output_enabled: bool,
}

/// State mutated from capability callbacks
struct Shared {
    is_listening: bool,
    is_speaking: bool,
    transcript: String,
    // Latch: at most one result delivery per capture session
    result_delivered: bool,
}

/// Handler for recognized utterances
pub type ResultHandler = Box<dyn FnMut(String) + Send>;

/// Platform capabilities injected into the controller
///
/// Each capability is optional; an absent one degrades the corresponding
/// operations to permanent no-ops.
pub struct VoiceBackends {
    /// Speech recognizer
    pub capture: Option<Box<dyn SpeechCapture>>,
    /// Local speech synthesis engine (fallback output)
    pub synthesis: Option<Box<dyn SpeechOutput>>,
    /// Audio device for remote TTS playback
    pub playback: Option<Box<dyn AudioOutput>>,
}

impl VoiceBackends {
    /// Probe the platform once for all three capabilities
    #[must_use]
    pub fn detect() -> Self {
        Self {
            capture: capture::detect(),
            synthesis: CommandSynthesizer::detect()
                .map(|s| Box::new(s) as Box<dyn SpeechOutput>),
            playback: CpalPlayer::detect().map(|p| Box::new(p) as Box<dyn AudioOutput>),
        }
    }

    /// No capabilities; every voice operation becomes a no-op
    #[must_use]
    pub const fn none() -> Self {
        Self {
            capture: None,
            synthesis: None,
            playback: None,
        }
    }
}

/// Coordinates speech capture and speech output for one session
///
/// Owns its state exclusively; constructed at session start and released at
/// session teardown. At most one capture session and one playback are
/// active at a time.
pub struct VoiceController {
    client: BackendClient,
    settings: VoiceSettings,
    shared: Arc<Mutex<Shared>>,
    result_handler: Arc<Mutex<Option<ResultHandler>>>,
    capture: Option<Box<dyn SpeechCapture>>,
    synthesis: Option<Box<dyn SpeechOutput>>,
    playback: Option<Box<dyn AudioOutput>>,
    // The single current-audio handle; replaced (after a stop) on each
    // remote playback
    current: Option<Box<dyn PlaybackHandle>>,
    voice_output_enabled: bool,
}

impl VoiceController {
    /// Create a controller over the given backends
    #[must_use]
    pub fn new(client: BackendClient, settings: VoiceSettings, mut backends: VoiceBackends) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            is_listening: false,
            is_speaking: false,
            transcript: String::new(),
            result_delivered: false,
        }));
        let result_handler: Arc<Mutex<Option<ResultHandler>>> = Arc::new(Mutex::new(None));

        if let Some(capture) = backends.capture.as_mut() {
            let shared_cb = Arc::clone(&shared);
            let handler_cb = Arc::clone(&result_handler);

            capture.set_event_handler(Box::new(move |event| match event {
                CaptureEvent::Started => {
                    if let Ok(mut s) = shared_cb.lock() {
                        s.is_listening = true;
                    }
                }
                CaptureEvent::Result(text) => {
                    let deliver = shared_cb.lock().is_ok_and(|mut s| {
                        s.transcript.clone_from(&text);
                        let first = !s.result_delivered;
                        s.result_delivered = true;
                        first
                    });

                    if deliver {
                        if let Ok(mut guard) = handler_cb.lock() {
                            if let Some(handler) = guard.as_mut() {
                                handler(text);
                            }
                        }
                    }
                }
                CaptureEvent::Error(message) => {
                    tracing::warn!(error = %message, "speech capture error");
                    if let Ok(mut s) = shared_cb.lock() {
                        s.is_listening = false;
                    }
                }
                CaptureEvent::Ended => {
                    if let Ok(mut s) = shared_cb.lock() {
                        s.is_listening = false;
                    }
                }
            }));
        } else {
            tracing::debug!("speech capture unavailable, listening disabled");
        }

        if let Some(synthesis) = backends.synthesis.as_mut() {
            let shared_cb = Arc::clone(&shared);

            synthesis.set_event_handler(Box::new(move |event| {
                if let Ok(mut s) = shared_cb.lock() {
                    match event {
                        OutputEvent::Started => s.is_speaking = true,
                        OutputEvent::Ended => s.is_speaking = false,
                    }
                }
            }));
        }

        let voice_output_enabled = settings.output_enabled;

        Self {
            client,
            settings,
            shared,
            result_handler,
            capture: backends.capture,
            synthesis: backends.synthesis,
            playback: backends.playback,
            current: None,
            voice_output_enabled,
        }
    }

    /// A capture session is active
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.shared.lock().is_ok_and(|s| s.is_listening)
    }

    /// Audio output is active
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.shared.lock().is_ok_and(|s| s.is_speaking)
    }

    /// Most recently recognized utterance
    #[must_use]
    pub fn transcript(&self) -> String {
        self.shared
            .lock()
            .map_or_else(|_| String::new(), |s| s.transcript.clone())
    }

    /// Clear the recognized transcript (typically after consuming it)
    pub fn clear_transcript(&mut self) {
        if let Ok(mut s) = self.shared.lock() {
            s.transcript.clear();
        }
    }

    /// Replies should be spoken out loud
    #[must_use]
    pub const fn voice_output_enabled(&self) -> bool {
        self.voice_output_enabled
    }

    /// Toggle speaking of replies
    pub fn set_voice_output_enabled(&mut self, enabled: bool) {
        self.voice_output_enabled = enabled;
    }

    /// Snapshot of the observable state
    #[must_use]
    pub fn state(&self) -> VoiceState {
        let (is_listening, is_speaking, transcript) = self.shared.lock().map_or_else(
            |_| (false, false, String::new()),
            |s| (s.is_listening, s.is_speaking, s.transcript.clone()),
        );

        VoiceState {
            is_listening,
            is_speaking,
            transcript,
            voice_output_enabled: self.voice_output_enabled,
        }
    }

    /// Register the handler for recognized utterances
    ///
    /// Called at most once per capture session, with the final transcript.
    pub fn set_result_handler(&mut self, handler: impl FnMut(String) + Send + 'static) {
        if let Ok(mut guard) = self.result_handler.lock() {
            *guard = Some(Box::new(handler));
        }
    }

    /// Begin a capture session
    ///
    /// No-op when capture is unavailable or already listening. Start
    /// failures are logged, never surfaced.
    pub fn start_listening(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };

        {
            let Ok(mut s) = self.shared.lock() else { return };
            if s.is_listening {
                return;
            }
            s.result_delivered = false;
        }

        if let Err(e) = capture.start() {
            tracing::error!(error = %e, "failed to start speech capture");
        }
    }

    /// End the active capture session
    ///
    /// No-op when capture is unavailable or idle.
    pub fn stop_listening(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };

        if !self.shared.lock().is_ok_and(|s| s.is_listening) {
            return;
        }

        capture.stop();
    }

    /// Speak `text` out loud
    ///
    /// Empty text is a no-op. Remote TTS is tried first; any failure there
    /// (request, decode, device) falls back to local synthesis. Never fails
    /// outward: the terminal failure path is a log line and an idle state.
    pub async fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        self.set_speaking(true);

        if let Err(e) = self.speak_remote(text).await {
            tracing::warn!(error = %e, "remote TTS failed, falling back to local synthesis");
            self.set_speaking(false);
            self.speak_local(text);
        }
    }

    /// Cancel local speech synthesis and force the speaking flag down
    ///
    /// Remote-audio playback is not stopped here; only the next `speak`
    /// replaces it.
    pub fn cancel_speech(&mut self) {
        if let Some(synthesis) = self.synthesis.as_mut() {
            synthesis.cancel();
        }
        self.set_speaking(false);
    }

    /// Primary output path: remote TTS, then device playback
    async fn speak_remote(&mut self, text: &str) -> Result<()> {
        let audio = self.client.synthesize(text).await?;
        let clip = decode_audio(&audio)?;

        let Some(player) = self.playback.as_mut() else {
            return Err(Error::Audio("no audio output device available".to_string()));
        };

        // At most one active playback: stop the previous clip first
        if let Some(mut previous) = self.current.take() {
            previous.stop();
        }

        let shared = Arc::clone(&self.shared);
        let handle = player.play(
            clip,
            Box::new(move || {
                if let Ok(mut s) = shared.lock() {
                    s.is_speaking = false;
                }
            }),
        )?;

        self.current = Some(handle);
        Ok(())
    }

    /// Fallback output path: local synthesis with the preferred voice
    fn speak_local(&mut self, text: &str) {
        let Some(synthesis) = self.synthesis.as_mut() else {
            tracing::debug!("no local speech synthesis available");
            return;
        };

        let voice = select_voice(&synthesis.voices(), &self.settings.preferred_voices);
        let utterance = Utterance {
            text: text.to_string(),
            voice,
            pitch: self.settings.pitch,
            rate: self.settings.rate,
        };

        if let Err(e) = synthesis.speak(&utterance) {
            tracing::warn!(error = %e, "local speech synthesis failed");
        }
    }

    fn set_speaking(&self, speaking: bool) {
        if let Ok(mut s) = self.shared.lock() {
            s.is_speaking = speaking;
        }
    }
}
