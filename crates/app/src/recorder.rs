use std::collections::VecDeque;
use std::time::{Duration, Instant};

use vigil_audio::{AudioFrame, FrameSource};
use vigil_vad::VadEngine;

/// Grace period after detected speech during which low-probability frames
/// are still retained, so pauses inside an utterance are not clipped.
pub const HANGOVER_WINDOW: Duration = Duration::from_millis(800);

/// Recording aborts when nothing was spoken within this window.
pub const NO_SPEECH_ABORT: Duration = Duration::from_secs(3);

/// Provisional frames held while classified as non-speech.
pub const PREROLL_RING_FRAMES: usize = 20;

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub max_duration: Duration,
    pub silence_timeout: Duration,
    pub speech_threshold: f32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(15),
            silence_timeout: Duration::from_secs(2),
            speech_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Utterance complete: silence exceeded the timeout after speech.
    Silence,
    /// The user never spoke within the abort window.
    NoSpeech,
    /// Hard cap reached; always wins.
    MaxDuration,
    /// The frame source quiesced (shutdown).
    SourceEnded,
}

#[derive(Debug)]
pub struct Recording {
    pub samples: Vec<i16>,
    pub stop: StopReason,
}

impl Recording {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_at(&self, sample_rate: u32) -> Duration {
        Duration::from_millis(self.samples.len() as u64 * 1000 / sample_rate as u64)
    }
}

/// Silence-terminated command capture.
///
/// Clock source is the frame timestamps, not the wall clock, so the state
/// machine runs identically against scripted sources.
pub struct CommandRecorder {
    cfg: RecorderConfig,
}

impl CommandRecorder {
    pub fn new(cfg: RecorderConfig) -> Self {
        Self { cfg }
    }

    pub fn record(&self, source: &mut dyn FrameSource, vad: &mut dyn VadEngine) -> Recording {
        tracing::info!("Listening for command...");
        vad.reset();

        // Device backlog accumulated during wake confirmation belongs to
        // the utterance; prepend it.
        let mut out: Vec<i16> = source.drain_backlog();

        let mut ring: VecDeque<AudioFrame> = VecDeque::with_capacity(PREROLL_RING_FRAMES);
        let mut start: Option<Instant> = None;
        let mut last_speech: Option<Instant> = None;
        let mut has_spoken = false;

        let stop = loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::SourceEnded,
                Err(e) => {
                    tracing::warn!("Frame read failed during recording: {}", e);
                    continue;
                }
            };

            let now = frame.timestamp;
            let start = *start.get_or_insert(now);

            // Hard cap always wins
            if now.duration_since(start) >= self.cfg.max_duration {
                tracing::debug!("Recording hit the hard cap, finalizing.");
                break StopReason::MaxDuration;
            }

            let probability = match vad.score(&frame.samples) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("VAD scoring failed, dropping frame: {}", e);
                    continue;
                }
            };

            if probability > self.cfg.speech_threshold {
                last_speech = Some(now);
                has_spoken = true;
            }

            let in_hangover = has_spoken
                && last_speech
                    .map(|t| now.duration_since(t) < HANGOVER_WINDOW)
                    .unwrap_or(false);

            if in_hangover {
                // Flush provisional frames in chronological order, then
                // the current frame: recovers short pauses without
                // truncating the utterance.
                while let Some(buffered) = ring.pop_front() {
                    out.extend_from_slice(&buffered.samples);
                }
                out.extend_from_slice(&frame.samples);
            } else {
                if ring.len() == PREROLL_RING_FRAMES {
                    ring.pop_front();
                }
                ring.push_back(frame);
            }

            if has_spoken {
                let since_speech = last_speech
                    .map(|t| now.duration_since(t))
                    .unwrap_or(Duration::ZERO);
                if since_speech > self.cfg.silence_timeout {
                    tracing::debug!("Silence detected, finalizing recording.");
                    break StopReason::Silence;
                }
            } else if now.duration_since(start) > NO_SPEECH_ABORT {
                tracing::debug!("No initial speech detected, aborting.");
                break StopReason::NoSpeech;
            }
        };

        if !has_spoken {
            // Nothing was ever committed beyond recovered backlog; an
            // abort hands back an empty buffer.
            out.clear();
        }

        Recording { samples: out, stop }
    }
}
