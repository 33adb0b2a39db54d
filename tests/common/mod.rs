//! Shared test utilities

use std::io::Cursor;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a mock Noddy backend
pub async fn mock_backend() -> MockServer {
    MockServer::start().await
}

/// Mount a chat endpoint replying with `response`
pub async fn mount_chat_reply(server: &MockServer, response: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": response })),
        )
        .mount(server)
        .await;
}

/// Mount a chat endpoint failing with `status`
pub async fn mount_chat_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mount a TTS endpoint serving a short WAV clip
pub async fn mount_tts_wav(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sine_wav()))
        .mount(server)
        .await;
}

/// Mount a TTS endpoint failing with `status`
pub async fn mount_tts_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// A short mono WAV clip (50ms of 440Hz sine at 16kHz)
pub fn sine_wav() -> Vec<u8> {
    let sample_rate = 16000u32;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let num_samples = sample_rate / 20;
        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 32767.0) as i16;
            writer.write_sample(sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
