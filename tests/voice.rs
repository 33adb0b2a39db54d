//! Voice controller integration tests
//!
//! Exercises the controller without audio hardware: capture, local
//! synthesis and playback are test doubles; the TTS endpoint is a wiremock
//! server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use noddy_chat::voice::{
    AudioClip, AudioOutput, CaptureEvent, CaptureHandler, EndCallback, OutputEvent, OutputHandler,
    PlaybackHandle, SpeechCapture, SpeechOutput, Utterance, VoiceBackends, VoiceController,
};
use noddy_chat::{BackendClient, Result, VoiceSettings};

mod common;

// --- test doubles -------------------------------------------------------

#[derive(Default)]
struct CaptureState {
    handler: Option<CaptureHandler>,
    starts: usize,
    stops: usize,
}

/// Scripted speech recognizer
#[derive(Clone, Default)]
struct MockCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl MockCapture {
    fn fire(&self, event: CaptureEvent) {
        let mut state = self.state.lock().unwrap();
        if let Some(handler) = state.handler.as_mut() {
            handler(event);
        }
    }

    fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

impl SpeechCapture for MockCapture {
    fn set_event_handler(&mut self, handler: CaptureHandler) {
        self.state.lock().unwrap().handler = Some(handler);
    }

    fn start(&mut self) -> Result<()> {
        {
            self.state.lock().unwrap().starts += 1;
        }
        self.fire(CaptureEvent::Started);
        Ok(())
    }

    fn stop(&mut self) {
        {
            self.state.lock().unwrap().stops += 1;
        }
        self.fire(CaptureEvent::Ended);
    }
}

struct SynthState {
    handler: Option<OutputHandler>,
    spoken: Vec<Utterance>,
    cancels: usize,
    voices: Vec<String>,
}

/// Recording local synthesis engine; start/end events are fired manually
#[derive(Clone)]
struct MockSynth {
    state: Arc<Mutex<SynthState>>,
}

impl MockSynth {
    fn with_voices(names: &[&str]) -> Self {
        Self {
            state: Arc::new(Mutex::new(SynthState {
                handler: None,
                spoken: Vec::new(),
                cancels: 0,
                voices: names.iter().map(ToString::to_string).collect(),
            })),
        }
    }

    fn fire(&self, event: OutputEvent) {
        let mut state = self.state.lock().unwrap();
        if let Some(handler) = state.handler.as_mut() {
            handler(event);
        }
    }

    fn spoken(&self) -> Vec<Utterance> {
        self.state.lock().unwrap().spoken.clone()
    }

    fn cancels(&self) -> usize {
        self.state.lock().unwrap().cancels
    }
}

impl SpeechOutput for MockSynth {
    fn set_event_handler(&mut self, handler: OutputHandler) {
        self.state.lock().unwrap().handler = Some(handler);
    }

    fn voices(&self) -> Vec<String> {
        self.state.lock().unwrap().voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        {
            self.state.lock().unwrap().spoken.push(utterance.clone());
        }
        self.fire(OutputEvent::Started);
        Ok(())
    }

    fn cancel(&mut self) {
        self.state.lock().unwrap().cancels += 1;
    }
}

struct PlayRecord {
    samples: usize,
    stopped: Arc<AtomicBool>,
    on_end: Option<EndCallback>,
}

/// Recording audio output; playback end is triggered manually
#[derive(Clone, Default)]
struct MockPlayer {
    plays: Arc<Mutex<Vec<PlayRecord>>>,
}

struct MockHandle {
    stopped: Arc<AtomicBool>,
}

impl PlaybackHandle for MockHandle {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    fn is_active(&self) -> bool {
        !self.stopped.load(Ordering::Relaxed)
    }
}

impl MockPlayer {
    fn count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    fn sample_count(&self, index: usize) -> usize {
        self.plays.lock().unwrap()[index].samples
    }

    fn was_stopped(&self, index: usize) -> bool {
        self.plays.lock().unwrap()[index].stopped.load(Ordering::Relaxed)
    }

    /// Simulate the clip reaching its natural end
    fn finish(&self, index: usize) {
        let on_end = self.plays.lock().unwrap()[index].on_end.take();
        if let Some(on_end) = on_end {
            on_end();
        }
    }
}

impl AudioOutput for MockPlayer {
    fn play(&mut self, clip: AudioClip, on_end: EndCallback) -> Result<Box<dyn PlaybackHandle>> {
        let stopped = Arc::new(AtomicBool::new(false));
        self.plays.lock().unwrap().push(PlayRecord {
            samples: clip.samples.len(),
            stopped: Arc::clone(&stopped),
            on_end: Some(on_end),
        });
        Ok(Box::new(MockHandle { stopped }))
    }
}

fn controller_with(
    uri: &str,
    capture: Option<MockCapture>,
    synthesis: Option<MockSynth>,
    playback: Option<MockPlayer>,
) -> VoiceController {
    let backends = VoiceBackends {
        capture: capture.map(|c| Box::new(c) as Box<dyn SpeechCapture>),
        synthesis: synthesis.map(|s| Box::new(s) as Box<dyn SpeechOutput>),
        playback: playback.map(|p| Box::new(p) as Box<dyn AudioOutput>),
    };
    VoiceController::new(BackendClient::new(uri), VoiceSettings::default(), backends)
}

// --- capture side -------------------------------------------------------

#[tokio::test]
async fn listening_start_and_stop_are_guarded() {
    let capture = MockCapture::default();
    let mut controller =
        controller_with("http://localhost:8000", Some(capture.clone()), None, None);

    assert!(!controller.is_listening());

    controller.start_listening();
    assert!(controller.is_listening());
    assert_eq!(capture.starts(), 1);

    // Already listening: no duplicate capture session
    controller.start_listening();
    assert_eq!(capture.starts(), 1);

    controller.stop_listening();
    assert!(!controller.is_listening());
    assert_eq!(capture.stops(), 1);

    // Already idle: no-op
    controller.stop_listening();
    assert_eq!(capture.stops(), 1);
}

#[tokio::test]
async fn listening_without_capture_backend_is_noop() {
    let mut controller = controller_with("http://localhost:8000", None, None, None);

    controller.start_listening();
    assert!(!controller.is_listening());
    controller.stop_listening();
    assert!(!controller.is_listening());
}

#[tokio::test]
async fn capture_result_delivered_once_per_session() {
    let capture = MockCapture::default();
    let mut controller =
        controller_with("http://localhost:8000", Some(capture.clone()), None, None);

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    controller.set_result_handler(move |text| sink.lock().unwrap().push(text));

    controller.start_listening();
    capture.fire(CaptureEvent::Result("hello".to_string()));
    capture.fire(CaptureEvent::Result("hello there".to_string()));
    capture.fire(CaptureEvent::Ended);

    // Transcript tracks the latest result; the handler saw only the first
    assert_eq!(controller.transcript(), "hello there");
    assert_eq!(*delivered.lock().unwrap(), vec!["hello".to_string()]);
    assert!(!controller.is_listening());

    // A new session re-arms delivery
    controller.start_listening();
    capture.fire(CaptureEvent::Result("next".to_string()));
    assert_eq!(
        *delivered.lock().unwrap(),
        vec!["hello".to_string(), "next".to_string()]
    );

    controller.clear_transcript();
    assert_eq!(controller.transcript(), "");
}

#[tokio::test]
async fn capture_error_forces_idle() {
    let capture = MockCapture::default();
    let mut controller =
        controller_with("http://localhost:8000", Some(capture.clone()), None, None);

    controller.start_listening();
    assert!(controller.is_listening());

    capture.fire(CaptureEvent::Error("no-speech".to_string()));
    assert!(!controller.is_listening());
}

// --- output side --------------------------------------------------------

#[tokio::test]
async fn speak_remote_success_skips_local_synthesis() {
    let server = common::mock_backend().await;
    common::mount_tts_wav(&server).await;

    let synth = MockSynth::with_voices(&["Samantha"]);
    let player = MockPlayer::default();
    let mut controller = controller_with(
        &server.uri(),
        None,
        Some(synth.clone()),
        Some(player.clone()),
    );

    controller.speak("hi there").await;

    assert_eq!(player.count(), 1);
    assert!(player.sample_count(0) > 0);
    assert!(synth.spoken().is_empty());
    assert!(controller.is_speaking());

    player.finish(0);
    assert!(!controller.is_speaking());
}

#[tokio::test]
async fn speak_remote_failure_falls_back_to_local() {
    let server = common::mock_backend().await;
    common::mount_tts_failure(&server, 500).await;

    let synth = MockSynth::with_voices(&["Daniel", "Samantha", "Alex"]);
    let player = MockPlayer::default();
    let mut controller = controller_with(
        &server.uri(),
        None,
        Some(synth.clone()),
        Some(player.clone()),
    );

    controller.speak("hi").await;

    // Local synthesis invoked exactly once, remote playback never started
    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(player.count(), 0);

    // Preferred voice and the fixed lightly-raised pitch
    assert_eq!(spoken[0].text, "hi");
    assert_eq!(spoken[0].voice.as_deref(), Some("Samantha"));
    assert!((spoken[0].pitch - 1.1).abs() < f32::EPSILON);
    assert!((spoken[0].rate - 1.0).abs() < f32::EPSILON);

    // Idle -> Speaking (engine start) -> Idle (engine end)
    assert!(controller.is_speaking());
    synth.fire(OutputEvent::Ended);
    assert!(!controller.is_speaking());
}

#[tokio::test]
async fn new_speak_stops_previous_playback() {
    let server = common::mock_backend().await;
    common::mount_tts_wav(&server).await;

    let player = MockPlayer::default();
    let mut controller = controller_with(&server.uri(), None, None, Some(player.clone()));

    controller.speak("first").await;
    controller.speak("second").await;

    assert_eq!(player.count(), 2);
    assert!(player.was_stopped(0));
    assert!(!player.was_stopped(1));
    assert!(controller.is_speaking());
}

#[tokio::test]
async fn empty_text_is_noop() {
    let server = common::mock_backend().await;

    // No TTS request may be issued
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/api/tts"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let player = MockPlayer::default();
    let mut controller = controller_with(&server.uri(), None, None, Some(player.clone()));

    controller.speak("").await;
    controller.speak("   ").await;

    assert_eq!(player.count(), 0);
    assert!(!controller.is_speaking());
}

#[tokio::test]
async fn cancel_speech_always_clears_speaking() {
    let server = common::mock_backend().await;
    common::mount_tts_failure(&server, 503).await;

    let synth = MockSynth::with_voices(&[]);
    let mut controller = controller_with(&server.uri(), None, Some(synth.clone()), None);

    // Idle cancel is safe
    controller.cancel_speech();
    assert!(!controller.is_speaking());
    assert_eq!(synth.cancels(), 1);

    // Cancel mid-fallback
    controller.speak("hello").await;
    assert!(controller.is_speaking());

    controller.cancel_speech();
    assert!(!controller.is_speaking());
    assert_eq!(synth.cancels(), 2);
}

#[tokio::test]
async fn cancel_without_synthesis_backend_is_safe() {
    let mut controller = controller_with("http://localhost:8000", None, None, None);
    controller.cancel_speech();
    assert!(!controller.is_speaking());
}

#[tokio::test]
async fn speak_with_no_backends_stays_idle() {
    let server = common::mock_backend().await;
    common::mount_tts_wav(&server).await;

    let mut controller = VoiceController::new(
        BackendClient::new(server.uri()),
        VoiceSettings::default(),
        VoiceBackends::none(),
    );

    // Remote synthesis succeeds but there is no device; the fallback has no
    // engine either. The terminal path is silence and a valid idle state.
    controller.speak("hello").await;
    assert!(!controller.is_speaking());
}

#[tokio::test]
async fn voice_output_toggle() {
    let mut controller = controller_with("http://localhost:8000", None, None, None);

    assert!(!controller.voice_output_enabled());
    controller.set_voice_output_enabled(true);
    assert!(controller.voice_output_enabled());

    let state = controller.state();
    assert!(state.voice_output_enabled);
    assert!(!state.is_listening);
    assert!(!state.is_speaking);
}
