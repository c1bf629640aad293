//! Microphone capture and speech detection.
//!
//! The cpal input callback converts whatever the device delivers into
//! fixed-size mono PCM16 frames and hands them to the orchestration task.
//! The [`SpeechDetector`] is an energy-threshold stand-in for a hotword
//! engine: it decides when an utterance starts and ends, and replays a
//! short pre-roll so the first syllables are not clipped.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FrameCount, SampleRate, StreamConfig};
use hearth_types::AudioFrame;
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Sample rate the speech service expects.
pub const SAMPLE_RATE: u32 = 16_000;
/// Samples per frame, 32 ms at 16 kHz.
pub const FRAME_SAMPLES: usize = 512;

/// RMS level above which a frame counts as speech.
const ENERGY_THRESHOLD: f32 = 0.03;
/// Frames of recent audio replayed when the detector wakes (about 0.5 s).
const PREROLL_FRAMES: usize = 16;
/// Speech frames required before the utterance counts as in progress.
const MIN_SPEECH_FRAMES: usize = 10;
/// Silent frames after waking before giving up (about 4 s).
const START_SILENCE_FRAMES: usize = 125;
/// Trailing silent frames that end the utterance (about 0.6 s).
const DONE_SILENCE_FRAMES: usize = 19;

/// What the detector observed in the incoming audio.
#[derive(Debug, PartialEq)]
pub enum CaptureEvent {
    Wake,
    Frame(AudioFrame),
    NoInput,
    UtteranceDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    /// Idle, buffering pre-roll, watching for the wake trigger.
    Waiting,
    /// Triggered; streaming, but the utterance is not yet confirmed.
    Woke,
    /// Utterance in progress; trailing silence ends it.
    Listening,
}

/// Turns a stream of raw frames into wake / frame / end-of-utterance
/// events. Strictly sequential; feed frames in capture order.
pub struct SpeechDetector {
    state: DetectorState,
    preroll: VecDeque<AudioFrame>,
    speech_frames: usize,
    silent_frames: usize,
}

impl SpeechDetector {
    pub fn new() -> Self {
        Self {
            state: DetectorState::Waiting,
            preroll: VecDeque::with_capacity(PREROLL_FRAMES),
            speech_frames: 0,
            silent_frames: 0,
        }
    }

    pub fn push(&mut self, frame: AudioFrame) -> Vec<CaptureEvent> {
        let speech = rms(&frame) >= ENERGY_THRESHOLD;

        match self.state {
            DetectorState::Waiting => {
                if speech {
                    tracing::debug!("wake trigger fired");
                    self.state = DetectorState::Woke;
                    self.speech_frames = 1;
                    self.silent_frames = 0;

                    // Replay the buffered pre-roll ahead of the frame that
                    // triggered, so the utterance start survives intact.
                    let mut events = vec![CaptureEvent::Wake];
                    events.extend(self.preroll.drain(..).map(CaptureEvent::Frame));
                    events.push(CaptureEvent::Frame(frame));
                    events
                } else {
                    if self.preroll.len() == PREROLL_FRAMES {
                        self.preroll.pop_front();
                    }
                    self.preroll.push_back(frame);
                    Vec::new()
                }
            }
            DetectorState::Woke => {
                let mut events = vec![CaptureEvent::Frame(frame)];
                if speech {
                    self.speech_frames += 1;
                    self.silent_frames = 0;
                    if self.speech_frames >= MIN_SPEECH_FRAMES {
                        self.state = DetectorState::Listening;
                    }
                } else {
                    self.silent_frames += 1;
                    if self.silent_frames >= START_SILENCE_FRAMES {
                        tracing::debug!("no speech followed the wake trigger");
                        self.reset();
                        events.push(CaptureEvent::NoInput);
                    }
                }
                events
            }
            DetectorState::Listening => {
                let mut events = vec![CaptureEvent::Frame(frame)];
                if speech {
                    self.silent_frames = 0;
                } else {
                    self.silent_frames += 1;
                    if self.silent_frames >= DONE_SILENCE_FRAMES {
                        tracing::debug!("end of utterance detected");
                        self.reset();
                        events.push(CaptureEvent::UtteranceDone);
                    }
                }
                events
            }
        }
    }

    fn reset(&mut self) {
        self.state = DetectorState::Waiting;
        self.preroll.clear();
        self.speech_frames = 0;
        self.silent_frames = 0;
    }
}

impl Default for SpeechDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn rms(frame: &AudioFrame) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame
        .samples()
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    (sum / frame.len() as f64).sqrt() as f32
}

fn input_device(device_name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    tracing::debug!("audio host: {:?}", host.id());

    match device_name {
        Some(target) => {
            let devices = host
                .input_devices()
                .context("failed to enumerate input devices")?;
            for device in devices {
                if device.name().is_ok_and(|name| name == target) {
                    return Ok(device);
                }
            }
            Err(anyhow::anyhow!("input device not found: {}", target))
        }
        None => host
            .default_input_device()
            .context("no default input device"),
    }
}

/// Open the microphone and start delivering fixed-size mono PCM16 frames
/// on `frame_tx`. The returned stream must be kept alive for capture to
/// continue.
pub fn start(
    device_name: Option<String>,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let device = input_device(device_name.as_deref())?;
    tracing::info!(
        "using input device: {}",
        device.name().unwrap_or_else(|_| "<unnamed>".to_string())
    );

    let default_config = device
        .default_input_config()
        .context("failed to get default input config")?;
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(FRAME_SAMPLES as u32)),
    };
    let channel_count = config.channels as usize;
    tracing::info!("input stream config: {:?}", config);

    // Downmix to mono, convert to i16, and cut into exact frames. The
    // callback runs on the audio thread, so sends must never block.
    let mut pending: Vec<f32> = Vec::with_capacity(FRAME_SAMPLES * 2);
    let data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        if channel_count > 1 {
            pending.extend(
                data.chunks(channel_count)
                    .map(|c| c.iter().sum::<f32>() / channel_count as f32),
            );
        } else {
            pending.extend_from_slice(data);
        }

        while pending.len() >= FRAME_SAMPLES {
            let samples: Vec<i16> = pending
                .drain(..FRAME_SAMPLES)
                .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .collect();
            if let Err(e) = frame_tx.try_send(AudioFrame::new(samples)) {
                tracing::warn!("dropping captured frame: {:?}", e);
            }
        }
    };

    let stream = device.build_input_stream(
        &config,
        data_fn,
        move |err| tracing::error!("input stream error: {}", err),
        None,
    )?;
    stream.play().context("failed to start input stream")?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud() -> AudioFrame {
        AudioFrame::new(vec![8000; FRAME_SAMPLES])
    }

    fn quiet() -> AudioFrame {
        AudioFrame::new(vec![100; FRAME_SAMPLES])
    }

    #[test]
    fn quiet_audio_never_wakes() {
        let mut detector = SpeechDetector::new();
        for _ in 0..100 {
            assert!(detector.push(quiet()).is_empty());
        }
    }

    #[test]
    fn wake_replays_the_preroll_first() {
        let mut detector = SpeechDetector::new();
        detector.push(quiet());
        detector.push(quiet());
        detector.push(quiet());

        let events = detector.push(loud());
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], CaptureEvent::Wake);
        assert!(events[1..].iter().all(|e| matches!(e, CaptureEvent::Frame(_))));
    }

    #[test]
    fn preroll_is_bounded() {
        let mut detector = SpeechDetector::new();
        for _ in 0..PREROLL_FRAMES + 5 {
            detector.push(quiet());
        }

        let events = detector.push(loud());
        assert_eq!(events.len(), 1 + PREROLL_FRAMES + 1);
    }

    #[test]
    fn short_burst_times_out_as_no_input() {
        let mut detector = SpeechDetector::new();
        detector.push(loud());

        let mut last = Vec::new();
        for _ in 0..START_SILENCE_FRAMES {
            last = detector.push(quiet());
        }
        assert_eq!(last.last(), Some(&CaptureEvent::NoInput));

        // Back to waiting: the next burst wakes again.
        let events = detector.push(loud());
        assert_eq!(events.first(), Some(&CaptureEvent::Wake));
    }

    #[test]
    fn trailing_silence_ends_the_utterance() {
        let mut detector = SpeechDetector::new();
        for _ in 0..MIN_SPEECH_FRAMES {
            detector.push(loud());
        }

        let mut last = Vec::new();
        for _ in 0..DONE_SILENCE_FRAMES {
            last = detector.push(quiet());
        }
        assert_eq!(last.last(), Some(&CaptureEvent::UtteranceDone));
    }

    #[test]
    fn every_frame_after_wake_is_forwarded() {
        let mut detector = SpeechDetector::new();
        detector.push(loud());

        let events = detector.push(quiet());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CaptureEvent::Frame(_)));
    }
}
