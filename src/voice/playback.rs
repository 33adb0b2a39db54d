//! Remote-audio playback
//!
//! Plays the audio returned by the TTS endpoint on the default output
//! device. At most one clip plays at a time: the controller stops the
//! previous handle before starting a new one.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Decoded audio ready for playback
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Samples per second
    pub sample_rate: u32,
}

/// Callback invoked once when playback reaches the end of the clip.
/// A stopped playback does not run it.
pub type EndCallback = Box<dyn FnOnce() + Send>;

/// Handle to an active playback
pub trait PlaybackHandle: Send {
    /// Stop playback and release the device resources
    fn stop(&mut self);

    /// Whether the clip is still playing
    fn is_active(&self) -> bool;
}

/// An audio output capability
pub trait AudioOutput: Send {
    /// Start playing `clip`
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device/configuration exists.
    fn play(&mut self, clip: AudioClip, on_end: EndCallback) -> Result<Box<dyn PlaybackHandle>>;
}

/// Plays clips on the default output device
pub struct CpalPlayer;

impl CpalPlayer {
    /// Probe for an output device
    #[must_use]
    pub fn detect() -> Option<Self> {
        let host = cpal::default_host();
        if host.default_output_device().is_none() {
            tracing::debug!("no audio output device available");
            return None;
        }
        Some(Self)
    }
}

struct CpalHandle {
    stop: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle for CpalHandle {
    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl AudioOutput for CpalPlayer {
    fn play(&mut self, clip: AudioClip, on_end: EndCallback) -> Result<Box<dyn PlaybackHandle>> {
        if clip.samples.is_empty() {
            on_end();
            return Ok(Box::new(CpalHandle {
                stop: Arc::new(AtomicBool::new(false)),
                active: Arc::new(AtomicBool::new(false)),
                thread: None,
            }));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));

        // cpal streams aren't Send, so the stream lives on a dedicated
        // thread; setup errors are handed back over a channel
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let stop_flag = Arc::clone(&stop);
        let active_flag = Arc::clone(&active);

        let thread = std::thread::spawn(move || {
            run_playback(clip, &ready_tx, &stop_flag, on_end);
            active_flag.store(false, Ordering::Relaxed);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalHandle {
                stop,
                active,
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::Audio("playback thread died during setup".to_string()))
            }
        }
    }
}

/// Open a stream for `clip`, report setup status, then feed samples until
/// the clip ends or `stop` is raised
fn run_playback(
    clip: AudioClip,
    ready_tx: &mpsc::Sender<Result<()>>,
    stop: &Arc<AtomicBool>,
    on_end: EndCallback,
) {
    let sample_rate = clip.sample_rate;

    let (device, config) = match open_output(sample_rate) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let channels = config.channels as usize;
    let samples = Arc::new(clip.samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let samples_cb = Arc::clone(&samples);
    let position_cb = Arc::clone(&position);
    let finished_cb = Arc::clone(&finished);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let pos = position_cb.load(Ordering::Relaxed);
                let sample = if pos < samples_cb.len() {
                    position_cb.store(pos + 1, Ordering::Relaxed);
                    samples_cb[pos]
                } else {
                    finished_cb.store(true, Ordering::Relaxed);
                    0.0
                };

                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
        },
        |err| {
            tracing::error!(error = %err, "audio playback error");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(Error::Audio(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(Error::Audio(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    let sample_count = samples.len();
    let duration_ms = (sample_count as u64 * 1000) / u64::from(sample_rate);

    // Poll for completion with a timeout margin
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::Relaxed) && !stop.load(Ordering::Relaxed) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(25));
    }

    let stopped = stop.load(Ordering::Relaxed);

    if !stopped {
        // Small delay so the device drains the tail of the clip
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    drop(stream);
    tracing::debug!(samples = sample_count, stopped, "playback finished");

    if !stopped {
        on_end();
    }
}

/// Find an output device and a mono (or stereo) config at `sample_rate`
fn open_output(sample_rate: u32) -> Result<(cpal::Device, StreamConfig)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(sample_rate))
        .config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate,
        channels = config.channels,
        "audio playback initialized"
    );

    Ok((device, config))
}

/// Decode TTS audio bytes into a playable clip
///
/// WAV payloads (prototype backend) are recognized by their RIFF header;
/// everything else is treated as MP3 (production backend).
///
/// # Errors
///
/// Returns error if the payload is neither valid WAV nor valid MP3.
pub fn decode_audio(data: &[u8]) -> Result<AudioClip> {
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        decode_wav(data)
    } else {
        decode_mp3(data)
    }
}

/// Decode WAV bytes to mono f32 samples
fn decode_wav(data: &[u8]) -> Result<AudioClip> {
    let mut reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
    };

    let samples = downmix(&interleaved, channels);

    Ok(AudioClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(data: &[u8]) -> Result<AudioClip> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate.unsigned_abs();
                }

                let frame_floats: Vec<f32> = frame
                    .data
                    .iter()
                    .map(|&s| f32::from(s) / 32768.0)
                    .collect();

                samples.extend(downmix(&frame_floats, frame.channels.max(1)));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Audio("no audio frames in payload".to_string()));
    }

    Ok(AudioClip {
        samples,
        sample_rate,
    })
}

/// Average interleaved channels down to mono
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels)
        .map(|frame| {
            #[allow(clippy::cast_precision_loss)]
            let n = frame.len() as f32;
            frame.iter().sum::<f32>() / n
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode mono i16 samples as WAV bytes
    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in samples {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decode_wav_mono() {
        let data = wav_bytes(&[0, 16384, -16384, 32767], 22050, 1);
        let clip = decode_audio(&data).unwrap();

        assert_eq!(clip.sample_rate, 22050);
        assert_eq!(clip.samples.len(), 4);
        assert!((clip.samples[0]).abs() < f32::EPSILON);
        assert!((clip.samples[1] - 0.5).abs() < 0.01);
        assert!((clip.samples[2] + 0.5).abs() < 0.01);
    }

    #[test]
    fn decode_wav_stereo_downmixes() {
        // L = 1.0-ish, R = 0.0 -> mono ~0.5
        let data = wav_bytes(&[32767, 0, 32767, 0], 24000, 2);
        let clip = decode_audio(&data).unwrap();

        assert_eq!(clip.samples.len(), 2);
        assert!((clip.samples[0] - 0.5).abs() < 0.01);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_audio(b"not audio at all").is_err());
        assert!(decode_audio(&[]).is_err());
    }

    #[test]
    fn downmix_passthrough_for_mono() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix(&samples, 1), samples);
    }
}
