use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::capture::DeviceConfig;
use super::frame_reader::{FrameReader, RawFrame};
use super::resampler::{ResamplerQuality, StreamResampler};
use super::AudioFrame;
use vigil_foundation::AudioError;
use vigil_telemetry::{FpsTracker, PipelineMetrics, PipelineStage};

/// Yields fixed-size mono 16 kHz PCM frames to the detection loop.
///
/// `next_frame` blocks until a frame is available; `Ok(None)` means the
/// source has quiesced (shutdown, or a scripted source ran dry) and the
/// caller should wind down. `drain_backlog` hands over every sample already
/// buffered ahead of the cursor, recovering speech that arrived while the
/// caller was busy elsewhere (e.g. wake-word confirmation latency).
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<AudioFrame>, AudioError>;
    fn drain_backlog(&mut self) -> Vec<i16>;
}

pub struct SourceConfig {
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
    pub resampler_quality: ResamplerQuality,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            frame_size_samples: 512,
            sample_rate_hz: 16_000,
            resampler_quality: ResamplerQuality::Balanced,
        }
    }
}

/// Live frame source: drains the capture ring, downmixes to mono,
/// resamples to the detection rate, and emits exact fixed-size frames.
pub struct CaptureFrameSource {
    frame_reader: FrameReader,
    cfg: SourceConfig,
    buffer: VecDeque<i16>,
    samples_emitted: u64,
    start_time: Instant,
    running: Arc<AtomicBool>,
    metrics: Option<Arc<PipelineMetrics>>,
    fps_tracker: FpsTracker,
    // Resampling state
    resampler: Option<StreamResampler>,
    current_input_rate: Option<u32>,
    current_input_channels: Option<u16>,
    device_cfg_rx: Option<tokio::sync::broadcast::Receiver<DeviceConfig>>,
}

impl CaptureFrameSource {
    pub fn new(frame_reader: FrameReader, cfg: SourceConfig, running: Arc<AtomicBool>) -> Self {
        let cap = cfg.frame_size_samples * 4;
        Self {
            frame_reader,
            cfg,
            buffer: VecDeque::with_capacity(cap),
            samples_emitted: 0,
            start_time: Instant::now(),
            running,
            metrics: None,
            fps_tracker: FpsTracker::new(),
            resampler: None,
            current_input_rate: None,
            current_input_channels: None,
            device_cfg_rx: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_device_config(
        mut self,
        rx: tokio::sync::broadcast::Receiver<DeviceConfig>,
    ) -> Self {
        self.device_cfg_rx = Some(rx);
        self
    }

    fn apply_device_updates(&mut self) {
        if let Some(rx) = &mut self.device_cfg_rx {
            while let Ok(cfg) = rx.try_recv() {
                self.frame_reader
                    .update_device_config(cfg.sample_rate, cfg.channels);
            }
        }
    }

    fn reconfigure_for_device(&mut self, frame: &RawFrame) {
        let needs_resampling = frame.sample_rate != self.cfg.sample_rate_hz;

        if needs_resampling {
            tracing::info!(
                "Configuring resampler: {}Hz {} ch -> {}Hz mono",
                frame.sample_rate,
                frame.channels,
                self.cfg.sample_rate_hz
            );
            self.resampler = Some(StreamResampler::new_with_quality(
                frame.sample_rate,
                self.cfg.sample_rate_hz,
                self.cfg.resampler_quality,
            ));
        } else {
            tracing::info!(
                "Device already at target rate {}Hz, no resampling needed",
                frame.sample_rate
            );
            self.resampler = None;
        }

        self.current_input_rate = Some(frame.sample_rate);
        self.current_input_channels = Some(frame.channels);
    }

    fn process_raw(&mut self, frame: &RawFrame) -> Vec<i16> {
        if self.current_input_rate != Some(frame.sample_rate)
            || self.current_input_channels != Some(frame.channels)
        {
            self.reconfigure_for_device(frame);
        }

        // Downmix to mono by averaging interleaved channels
        let mono_samples = if frame.channels == 1 {
            frame.samples.clone()
        } else {
            let channels = frame.channels as usize;
            frame
                .samples
                .chunks_exact(channels)
                .map(|chunk| {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        if let Some(resampler) = &mut self.resampler {
            resampler.process(&mono_samples)
        } else {
            mono_samples
        }
    }

    /// Pull whatever the device has already produced into the local buffer.
    fn ingest_available(&mut self) -> bool {
        let mut got_any = false;
        while let Some(raw) = self.frame_reader.read_frame(4096) {
            got_any = true;
            if let Some(m) = &self.metrics {
                m.increment_capture_frames();
                m.update_audio_level(&raw.samples);
                m.mark_stage_active(PipelineStage::Capture);
            }
            let processed = self.process_raw(&raw);
            self.buffer.extend(processed);
        }
        got_any
    }

    fn pop_frame(&mut self) -> Option<AudioFrame> {
        let fs = self.cfg.frame_size_samples;
        if self.buffer.len() < fs {
            return None;
        }
        let mut out = Vec::with_capacity(fs);
        for _ in 0..fs {
            out.push(self.buffer.pop_front().unwrap());
        }

        let timestamp = self.timestamp_at(self.samples_emitted);
        self.samples_emitted += fs as u64;

        if let Some(m) = &self.metrics {
            if let Some(fps) = self.fps_tracker.tick() {
                m.update_capture_fps(fps);
            }
        }

        Some(AudioFrame {
            samples: out,
            timestamp,
            sample_rate: self.cfg.sample_rate_hz,
        })
    }

    fn timestamp_at(&self, samples_emitted: u64) -> Instant {
        let ms = samples_emitted * 1000 / self.cfg.sample_rate_hz as u64;
        self.start_time + Duration::from_millis(ms)
    }
}

impl FrameSource for CaptureFrameSource {
    fn next_frame(&mut self) -> Result<Option<AudioFrame>, AudioError> {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Ok(None);
            }

            self.apply_device_updates();

            if let Some(frame) = self.pop_frame() {
                return Ok(Some(frame));
            }

            if !self.ingest_available() {
                // At 16kHz with 512-sample frames, new data lands every
                // 32ms; polling at 25ms checks at least once per frame
                // period without spinning.
                std::thread::sleep(Duration::from_millis(25));
            }
        }
    }

    fn drain_backlog(&mut self) -> Vec<i16> {
        self.apply_device_updates();
        self.ingest_available();

        let drained: Vec<i16> = self.buffer.drain(..).collect();
        self.samples_emitted += drained.len() as u64;
        if !drained.is_empty() {
            tracing::debug!("Recovered {} backlog samples", drained.len());
        }
        drained
    }
}

/// Deterministic frame source fed from a prepared script. Used by the
/// state-machine tests and offline replay.
pub struct ScriptedSource {
    frames: VecDeque<AudioFrame>,
    backlog: Vec<i16>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames: frames.into(),
            backlog: Vec::new(),
        }
    }

    pub fn with_backlog(mut self, backlog: Vec<i16>) -> Self {
        self.backlog = backlog;
        self
    }

    /// Build a script of uniform frames starting at `base`, one frame
    /// period apart.
    pub fn uniform(base: Instant, count: usize, frame: Vec<i16>, sample_rate: u32) -> Self {
        let frame_ms = frame.len() as u64 * 1000 / sample_rate as u64;
        let frames = (0..count)
            .map(|i| AudioFrame {
                samples: frame.clone(),
                timestamp: base + Duration::from_millis(i as u64 * frame_ms),
                sample_rate,
            })
            .collect();
        Self::new(frames)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<AudioFrame>, AudioError> {
        Ok(self.frames.pop_front())
    }

    fn drain_backlog(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.backlog)
    }
}
