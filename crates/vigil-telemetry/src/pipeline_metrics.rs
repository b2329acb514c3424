use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring
#[derive(Clone)]
pub struct PipelineMetrics {
    // Audio level monitoring
    pub current_peak: Arc<AtomicI16>, // Peak sample value in current window
    pub current_rms: Arc<AtomicU64>,  // RMS * 1000 for precision
    pub audio_level_db: Arc<AtomicI16>, // Current level in dB * 10

    // Pipeline stage tracking
    pub stage_capture: Arc<AtomicBool>, // Data reached capture stage
    pub stage_detect: Arc<AtomicBool>,  // Data reached detection stage
    pub stage_playback: Arc<AtomicBool>, // A playback session ran

    // Frame rate tracking
    pub capture_fps: Arc<AtomicU64>, // Frames per second * 10
    pub detect_fps: Arc<AtomicU64>,  // Detection frames per second * 10

    // Event counters
    pub capture_frames: Arc<AtomicU64>,
    pub detect_frames: Arc<AtomicU64>,
    pub wake_hits: Arc<AtomicU64>,
    pub wake_confirmed: Arc<AtomicU64>,
    pub wake_rejected: Arc<AtomicU64>,
    pub recordings_completed: Arc<AtomicU64>,
    pub recordings_aborted: Arc<AtomicU64>,
    pub dispatch_failures: Arc<AtomicU64>,
    pub playback_sessions: Arc<AtomicU64>,
    pub playback_interrupted: Arc<AtomicU64>,

    // Error tracking
    pub capture_errors: Arc<AtomicU64>,
    pub detector_errors: Arc<AtomicU64>,

    // Activity indicators
    pub is_recording: Arc<AtomicBool>,
    pub last_wake_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            current_peak: Arc::new(AtomicI16::new(0)),
            current_rms: Arc::new(AtomicU64::new(0)),
            audio_level_db: Arc::new(AtomicI16::new(-900)),

            stage_capture: Arc::new(AtomicBool::new(false)),
            stage_detect: Arc::new(AtomicBool::new(false)),
            stage_playback: Arc::new(AtomicBool::new(false)),

            capture_fps: Arc::new(AtomicU64::new(0)),
            detect_fps: Arc::new(AtomicU64::new(0)),

            capture_frames: Arc::new(AtomicU64::new(0)),
            detect_frames: Arc::new(AtomicU64::new(0)),
            wake_hits: Arc::new(AtomicU64::new(0)),
            wake_confirmed: Arc::new(AtomicU64::new(0)),
            wake_rejected: Arc::new(AtomicU64::new(0)),
            recordings_completed: Arc::new(AtomicU64::new(0)),
            recordings_aborted: Arc::new(AtomicU64::new(0)),
            dispatch_failures: Arc::new(AtomicU64::new(0)),
            playback_sessions: Arc::new(AtomicU64::new(0)),
            playback_interrupted: Arc::new(AtomicU64::new(0)),

            capture_errors: Arc::new(AtomicU64::new(0)),
            detector_errors: Arc::new(AtomicU64::new(0)),

            is_recording: Arc::new(AtomicBool::new(false)),
            last_wake_time: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    pub fn update_audio_level(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        let peak = samples.iter().map(|&s| s.abs()).max().unwrap_or(0);
        self.current_peak.store(peak, Ordering::Relaxed);

        let sum: i64 = samples.iter().map(|&s| s as i64 * s as i64).sum();
        let rms = ((sum as f64 / samples.len() as f64).sqrt() * 1000.0) as u64;
        self.current_rms.store(rms, Ordering::Relaxed);

        let db = if peak > 0 {
            (20.0 * (peak as f64 / 32768.0).log10() * 10.0) as i16
        } else {
            -900
        };
        self.audio_level_db.store(db, Ordering::Relaxed);
    }

    pub fn mark_stage_active(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Capture => self.stage_capture.store(true, Ordering::Relaxed),
            PipelineStage::Detect => self.stage_detect.store(true, Ordering::Relaxed),
            PipelineStage::Playback => self.stage_playback.store(true, Ordering::Relaxed),
        }
    }

    pub fn decay_stages(&self) {
        self.stage_capture.store(false, Ordering::Relaxed);
        self.stage_detect.store(false, Ordering::Relaxed);
        self.stage_playback.store(false, Ordering::Relaxed);
    }

    pub fn update_capture_fps(&self, fps: f64) {
        self.capture_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_detect_fps(&self, fps: f64) {
        self.detect_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn increment_capture_frames(&self) {
        self.capture_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_detect_frames(&self) {
        self.detect_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wake_hit(&self, confirmed: bool) {
        self.wake_hits.fetch_add(1, Ordering::Relaxed);
        if confirmed {
            self.wake_confirmed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.wake_rejected.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_wake_time.write() = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PipelineStage {
    Capture,
    Detect,
    Playback,
}

#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
