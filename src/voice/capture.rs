//! Speech capture (speech-to-text) abstraction

use crate::Result;

/// Events delivered by a capture backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Capture became active
    Started,
    /// A recognized utterance
    Result(String),
    /// Capture failed (permission denied, no speech detected, ...)
    Error(String),
    /// Capture returned to idle
    Ended,
}

/// Handler invoked for each capture event
pub type CaptureHandler = Box<dyn FnMut(CaptureEvent) + Send>;

/// A speech-to-text capture capability
///
/// Implementations are platform-provided (a recognizer bridged in by the
/// embedding shell, or a test double). The controller registers a single
/// handler at construction; events must be delivered in the order the
/// platform produces them, and a capture session delivers at most one
/// `Result` before `Ended`.
pub trait SpeechCapture: Send {
    /// Register the event handler. Called once, before any [`start`].
    ///
    /// [`start`]: SpeechCapture::start
    fn set_event_handler(&mut self, handler: CaptureHandler);

    /// Begin a capture session
    ///
    /// # Errors
    ///
    /// Returns error if the underlying recognizer refuses to start.
    fn start(&mut self) -> Result<()>;

    /// End the active capture session, if any
    fn stop(&mut self);
}

/// Detect a platform speech recognizer
///
/// None of the targets this crate builds for ship a native recognizer, so
/// detection reports absence and listening degrades to a permanent no-op.
/// Embedders that do have one (e.g. a WebView bridge) inject their own
/// [`SpeechCapture`] through [`VoiceBackends`](crate::voice::VoiceBackends).
#[must_use]
pub fn detect() -> Option<Box<dyn SpeechCapture>> {
    tracing::debug!("no speech capture available on this platform");
    None
}
