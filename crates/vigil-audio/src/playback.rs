use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::device::DeviceManager;
use super::resampler::{ResamplerQuality, StreamResampler};
use super::wav;
use vigil_telemetry::PipelineMetrics;

/// One playback submission, normalized by the engine before streaming.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// When set, the buffer repeats from the start until this much wall
    /// time has elapsed since the session began.
    pub loop_for: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Silence prepended so output hardware wakes before audible content.
    pub lead_in: Duration,
    pub resampler_quality: ResamplerQuality,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44_100,
            channels: 1,
            lead_in: Duration::ZERO,
            resampler_quality: ResamplerQuality::Balanced,
        }
    }
}

/// Flags shared between the engine, the worker thread, and the stream
/// callback. `cancel` is irreversible for a session; a new session gets a
/// fresh set of flags.
struct SessionShared {
    cancel: AtomicBool,
    done: AtomicBool,
    failed: AtomicBool,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            cancel: AtomicBool::new(false),
            done: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }
}

/// The live state of one playback operation.
struct PlaybackSession {
    shared: Arc<SessionShared>,
    handle: JoinHandle<()>,
}

enum FillOutcome {
    Continue,
    Finished,
}

/// Cursor over the normalized buffer, advanced by the output callback one
/// chunk at a time. Cancellation and the loop deadline are both checked
/// once per chunk, so interruption takes effect within one chunk's latency.
struct CursorState {
    samples: Vec<i16>,
    cursor: usize,
    loop_deadline: Option<Instant>,
}

impl CursorState {
    fn new(samples: Vec<i16>, loop_deadline: Option<Instant>) -> Self {
        Self {
            samples,
            cursor: 0,
            loop_deadline,
        }
    }

    fn fill(&mut self, out: &mut [i16], now: Instant, cancelled: bool) -> FillOutcome {
        if cancelled {
            out.fill(0);
            return FillOutcome::Finished;
        }
        if let Some(deadline) = self.loop_deadline {
            if now >= deadline {
                out.fill(0);
                return FillOutcome::Finished;
            }
        }

        let mut written = 0;
        while written < out.len() {
            if self.cursor >= self.samples.len() {
                let keep_looping = self
                    .loop_deadline
                    .map(|deadline| now < deadline)
                    .unwrap_or(false);
                if keep_looping && !self.samples.is_empty() {
                    self.cursor = 0;
                } else {
                    out[written..].fill(0);
                    return FillOutcome::Finished;
                }
            }
            let n = (out.len() - written).min(self.samples.len() - self.cursor);
            out[written..written + n]
                .copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
            self.cursor += n;
            written += n;
        }
        FillOutcome::Continue
    }
}

/// Interruptible, loopable audio output. At most one session is live at a
/// time; submitting a new request cancels and joins the previous session
/// before the new stream opens.
pub struct PlaybackEngine {
    cfg: PlaybackConfig,
    active: Mutex<Option<PlaybackSession>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl PlaybackEngine {
    pub fn new(cfg: PlaybackConfig) -> Self {
        Self {
            cfg,
            active: Mutex::new(None),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Normalize and start playback asynchronously; returns immediately.
    pub fn play(&self, request: PlaybackRequest) {
        let mut active = self.active.lock();
        self.stop_locked(&mut active);

        let samples = normalize(&request, &self.cfg);
        if samples.is_empty() {
            return;
        }

        if let Some(m) = &self.metrics {
            m.playback_sessions.fetch_add(1, Ordering::Relaxed);
            m.mark_stage_active(vigil_telemetry::PipelineStage::Playback);
        }

        let shared = Arc::new(SessionShared::new());
        let worker_shared = Arc::clone(&shared);
        let cfg = self.cfg.clone();
        let loop_for = request.loop_for;

        let handle = thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || run_session(cfg, worker_shared, samples, loop_for));

        match handle {
            Ok(handle) => *active = Some(PlaybackSession { shared, handle }),
            Err(e) => tracing::error!("Failed to spawn playback thread: {}", e),
        }
    }

    /// Decode and play an in-memory WAV (e.g. dispatcher response audio).
    pub fn play_wav_bytes(&self, bytes: &[u8]) {
        match wav::decode_wav_bytes(bytes) {
            Ok(request) => self.play(request),
            Err(e) => tracing::error!("Failed to decode response audio: {}", e),
        }
    }

    /// Play a local WAV file, optionally looping for a bounded duration.
    pub fn play_wav_file(&self, path: &Path, loop_for: Option<Duration>) {
        match wav::decode_wav_file(path) {
            Ok(mut request) => {
                request.loop_for = loop_for;
                self.play(request);
            }
            Err(e) => tracing::error!("Failed to load sound {}: {}", path.display(), e),
        }
    }

    /// Cancel the active session, if any, and wait (bounded) for its
    /// cleanup. Idempotent; a no-op when nothing is playing.
    pub fn stop(&self) {
        let mut active = self.active.lock();
        self.stop_locked(&mut active);
    }

    pub fn is_playing(&self) -> bool {
        let active = self.active.lock();
        active
            .as_ref()
            .map(|s| !s.shared.done.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn stop_locked(&self, active: &mut Option<PlaybackSession>) {
        let Some(session) = active.take() else {
            return;
        };

        let was_live = !session.shared.done.load(Ordering::SeqCst);
        session.shared.cancel.store(true, Ordering::SeqCst);

        // Bounded join: the worker honors cancel within one chunk, so this
        // normally resolves in tens of milliseconds.
        let deadline = Instant::now() + Duration::from_secs(2);
        while !session.shared.done.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if session.shared.done.load(Ordering::SeqCst) {
            let _ = session.handle.join();
        } else {
            tracing::error!("Playback session did not stop in time; abandoning it");
        }

        if was_live {
            if let Some(m) = &self.metrics {
                m.playback_interrupted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Convert a request to the engine's output rate and channel count and
/// prepend the lead-in pad. Always interleaved i16.
fn normalize(request: &PlaybackRequest, cfg: &PlaybackConfig) -> Vec<i16> {
    if request.samples.is_empty() {
        return Vec::new();
    }

    // Downmix to mono at the source rate
    let mono: Vec<i16> = if request.channels <= 1 {
        request.samples.clone()
    } else {
        let channels = request.channels as usize;
        request
            .samples
            .chunks_exact(channels)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    // Resample to the output rate
    let resampled = if request.sample_rate == cfg.sample_rate {
        mono
    } else {
        let mut rs = StreamResampler::new_with_quality(
            request.sample_rate,
            cfg.sample_rate,
            cfg.resampler_quality,
        );
        let mut out = rs.process(&mono);
        // Flush the filter tail with silence
        out.extend(rs.process(&vec![0i16; 2048]));
        out
    };

    // Fan out to the output channel count, with the lead-in pad up front
    let channels = cfg.channels.max(1) as usize;
    let pad_frames = (cfg.lead_in.as_millis() as usize * cfg.sample_rate as usize) / 1000;
    let mut out = Vec::with_capacity((pad_frames + resampled.len()) * channels);
    out.resize(pad_frames * channels, 0);
    for &s in &resampled {
        for _ in 0..channels {
            out.push(s);
        }
    }
    out
}

/// Worker thread body: owns the output stream for the session lifetime.
/// Any device failure abandons the session and leaves the engine idle.
fn run_session(
    cfg: PlaybackConfig,
    shared: Arc<SessionShared>,
    samples: Vec<i16>,
    loop_for: Option<Duration>,
) {
    let result = open_and_stream(&cfg, &shared, samples, loop_for);
    if let Err(e) = result {
        tracing::error!("Audio playback failed: {}", e);
        shared.failed.store(true, Ordering::SeqCst);
    }
    shared.done.store(true, Ordering::SeqCst);
}

fn open_and_stream(
    cfg: &PlaybackConfig,
    shared: &Arc<SessionShared>,
    samples: Vec<i16>,
    loop_for: Option<Duration>,
) -> Result<(), vigil_foundation::AudioError> {
    use vigil_foundation::AudioError;

    let device_manager = DeviceManager::new()?;
    let device = device_manager.open_output(cfg.device.as_deref())?;

    let sample_format = device
        .default_output_config()
        .map(|c| c.sample_format())
        .unwrap_or(SampleFormat::F32);

    let stream_config = StreamConfig {
        channels: cfg.channels,
        sample_rate: cpal::SampleRate(cfg.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let duration_ms = samples.len() as u64 * 1000
        / (cfg.sample_rate as u64 * cfg.channels.max(1) as u64);
    tracing::debug!(
        "Playing audio ({:.2}s) at {}Hz{}",
        duration_ms as f64 / 1000.0,
        cfg.sample_rate,
        if loop_for.is_some() { " (looping)" } else { "" }
    );

    let loop_deadline = loop_for.map(|d| Instant::now() + d);
    let state = Arc::new(Mutex::new(CursorState::new(samples, loop_deadline)));

    let err_shared = Arc::clone(shared);
    let err_fn = move |err: cpal::StreamError| {
        tracing::error!("Playback stream error: {}", err);
        err_shared.failed.store(true, Ordering::SeqCst);
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let cb_state = Arc::clone(&state);
            let cb_shared = Arc::clone(shared);
            device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let cancelled = cb_shared.cancel.load(Ordering::SeqCst);
                    let outcome = cb_state.lock().fill(data, Instant::now(), cancelled);
                    if matches!(outcome, FillOutcome::Finished) {
                        cb_shared.done.store(true, Ordering::SeqCst);
                    }
                },
                err_fn,
                None,
            )?
        }
        _ => {
            // Everything else goes through f32, cpal's universal format
            let cb_state = Arc::clone(&state);
            let cb_shared = Arc::clone(shared);
            let mut scratch: Vec<i16> = Vec::new();
            device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    scratch.clear();
                    scratch.resize(data.len(), 0);
                    let cancelled = cb_shared.cancel.load(Ordering::SeqCst);
                    let outcome = cb_state.lock().fill(&mut scratch, Instant::now(), cancelled);
                    for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                        *dst = src as f32 / 32768.0;
                    }
                    if matches!(outcome, FillOutcome::Finished) {
                        cb_shared.done.store(true, Ordering::SeqCst);
                    }
                },
                err_fn,
                None,
            )?
        }
    };

    stream.play()?;

    // Wait for the callback to finish the buffer, a stream error, or an
    // unresponsive device after cancellation.
    let mut cancel_seen: Option<Instant> = None;
    loop {
        if shared.done.load(Ordering::SeqCst) {
            break;
        }
        if shared.failed.load(Ordering::SeqCst) {
            return Err(AudioError::Fatal("output stream failed mid-session".into()));
        }
        if shared.cancel.load(Ordering::SeqCst) {
            let seen = cancel_seen.get_or_insert_with(Instant::now);
            if seen.elapsed() > Duration::from_secs(1) {
                tracing::warn!("Output device ignored cancellation; forcing stream close");
                break;
            }
        }
        thread::sleep(Duration::from_millis(20));
    }

    drop(stream);
    tracing::debug!("Playback session ended");
    Ok(())
}
