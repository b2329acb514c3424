//! Shared test doubles: scripted detector engines and frame builders.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use vigil_audio::AudioFrame;
use vigil_vad::VadEngine;
use vigil_wake::{WakeEngine, WakeHit};

pub const FRAME: usize = 512;
pub const FRAME_MS: u64 = 32;

/// Build one detection-path frame at `idx` frame periods past `base`.
pub fn frame_at(base: Instant, idx: usize, fill: i16) -> AudioFrame {
    AudioFrame {
        samples: vec![fill; FRAME],
        timestamp: base + Duration::from_millis(idx as u64 * FRAME_MS),
        sample_rate: 16_000,
    }
}

/// Build a run of frames: for each `(count, fill)` segment, `count` frames
/// of that fill value, consecutively timestamped from `base`.
pub fn frame_script(base: Instant, segments: &[(usize, i16)]) -> Vec<AudioFrame> {
    let mut frames = Vec::new();
    let mut idx = 0;
    for &(count, fill) in segments {
        for _ in 0..count {
            frames.push(frame_at(base, idx, fill));
            idx += 1;
        }
    }
    frames
}

/// VAD double driven by a probability script; falls back to a default
/// probability when the script runs dry.
pub struct FakeVad {
    script: VecDeque<f32>,
    default: f32,
    pub resets: Arc<AtomicUsize>,
}

impl FakeVad {
    pub fn new(script: Vec<f32>, default: f32) -> Self {
        Self {
            script: script.into(),
            default,
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script builder mirroring `frame_script`: `(count, probability)` runs.
    pub fn from_segments(segments: &[(usize, f32)], default: f32) -> Self {
        let mut script = Vec::new();
        for &(count, p) in segments {
            script.extend(std::iter::repeat(p).take(count));
        }
        Self::new(script, default)
    }
}

impl VadEngine for FakeVad {
    fn score(&mut self, _frame: &[i16]) -> Result<f32, String> {
        Ok(self.script.pop_front().unwrap_or(self.default))
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn required_sample_rate(&self) -> u32 {
        16_000
    }

    fn required_frame_size_samples(&self) -> usize {
        FRAME
    }
}

/// Wake double scoring one scripted result per full chunk.
pub struct FakeWake {
    chunk_samples: usize,
    script: VecDeque<Result<Option<WakeHit>, String>>,
    pub resets: Arc<AtomicUsize>,
}

impl FakeWake {
    pub fn new(chunk_samples: usize, script: Vec<Result<Option<WakeHit>, String>>) -> Self {
        Self {
            chunk_samples,
            script: script.into(),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn silent(chunk_samples: usize) -> Self {
        Self::new(chunk_samples, Vec::new())
    }

    pub fn hit(confidence: f32) -> Result<Option<WakeHit>, String> {
        Ok(Some(WakeHit {
            confidence,
            model_id: "test-model".to_string(),
        }))
    }
}

impl WakeEngine for FakeWake {
    fn score(&mut self, chunk: &[i16]) -> Result<Option<WakeHit>, String> {
        assert_eq!(
            chunk.len(),
            self.chunk_samples,
            "gate must deliver exact chunks"
        );
        self.script.pop_front().unwrap_or(Ok(None))
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }
}
