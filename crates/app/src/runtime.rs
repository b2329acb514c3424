use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context};

use crate::assets::AssetStore;
use crate::config::Settings;
use crate::dispatch::DispatcherClient;
use crate::gate::WakeGate;
use crate::pipeline::{DetectionLoop, PipelineOpts};
use crate::recorder::{CommandRecorder, RecorderConfig};
use vigil_audio::{
    AudioCaptureThread, AudioRingBuffer, CaptureFrameSource, FrameReader, PlaybackConfig,
    PlaybackEngine, SourceConfig,
};
use vigil_telemetry::PipelineMetrics;
use vigil_vad::{VadEngine, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
use vigil_vad_silero::{SileroConfig, SileroEngine};
use vigil_wake::{WakeConfig, WakeEngine};
use vigil_wake_rustpotter::RustpotterEngine;

const RING_BUFFER_SAMPLES: usize = 16384 * 4;

/// Handle to the running satellite pipeline.
pub struct AppHandle {
    pub metrics: Arc<PipelineMetrics>,
    running: Arc<AtomicBool>,
    audio_capture: AudioCaptureThread,
    detection_handle: JoinHandle<()>,
    playback: Arc<PlaybackEngine>,
}

impl AppHandle {
    /// Gracefully stop the pipeline and wait for shutdown.
    pub fn shutdown(self) {
        tracing::info!("Shutting down Vigil runtime...");

        // Quiesce the detection loop first so recording/dispatch wind down
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = self.detection_handle.join() {
            tracing::error!("Detection thread panicked during shutdown: {:?}", e);
        }

        self.audio_capture.stop();
        self.playback.stop();

        tracing::info!("Vigil runtime shutdown complete");
    }
}

/// Start the full pipeline: capture thread, frame source, detectors, gate,
/// recorder, playback engine, dispatcher, and the detection thread.
pub fn start(settings: Settings) -> anyhow::Result<AppHandle> {
    settings.validate().map_err(|e| anyhow!(e))?;

    let metrics = Arc::new(PipelineMetrics::default());

    // 1) Capture thread feeding the SPSC ring
    let ring_buffer = AudioRingBuffer::new(RING_BUFFER_SAMPLES);
    let (audio_producer, audio_consumer) = ring_buffer.split();
    let (audio_capture, device_cfg, device_cfg_rx) =
        AudioCaptureThread::spawn(audio_producer, settings.input_device.clone())
            .context("failed to start audio capture")?;
    tracing::info!(
        "Capture running at {}Hz, {} channel(s)",
        device_cfg.sample_rate,
        device_cfg.channels
    );

    // 2) Pull-based frame source for the detection thread
    let running = Arc::new(AtomicBool::new(true));
    let frame_reader = FrameReader::new(audio_consumer, device_cfg.sample_rate, device_cfg.channels);
    let source_cfg = SourceConfig {
        frame_size_samples: FRAME_SIZE_SAMPLES,
        sample_rate_hz: SAMPLE_RATE_HZ,
        resampler_quality: settings.resampler_quality.into(),
    };
    let source = CaptureFrameSource::new(frame_reader, source_cfg, running.clone())
        .with_metrics(metrics.clone())
        .with_device_config(device_cfg_rx);

    // 3) Detector engines
    let vad: Box<dyn VadEngine> = Box::new(
        SileroEngine::new(SileroConfig::default())
            .map_err(|e| anyhow!("failed to create VAD engine: {}", e))?,
    );
    let wake: Box<dyn WakeEngine> = Box::new(
        RustpotterEngine::new(
            &settings.wake_model,
            SAMPLE_RATE_HZ as usize,
            settings.wakeword_threshold,
        )
        .map_err(|e| anyhow!("failed to create wake engine: {}", e))?,
    );

    // 4) Gate + recorder
    let wake_cfg = WakeConfig {
        wakeword_threshold: settings.wakeword_threshold,
        gate_timeout_ms: settings.gate_timeout_ms,
        vad_gate_enabled: !settings.no_vad_gate,
    };
    let gate = WakeGate::new(wake_cfg, settings.speech_threshold, wake.chunk_samples());
    let recorder = CommandRecorder::new(RecorderConfig {
        max_duration: settings.max_command_duration(),
        silence_timeout: settings.silence_timeout(),
        speech_threshold: settings.speech_threshold,
    });

    // 5) Playback + collaborators
    let playback = Arc::new(
        PlaybackEngine::new(PlaybackConfig {
            device: settings.output_device.clone(),
            sample_rate: settings.output_rate,
            channels: settings.output_channels,
            lead_in: settings.output_delay(),
            resampler_quality: settings.resampler_quality.into(),
        })
        .with_metrics(metrics.clone()),
    );
    let dispatcher = Arc::new(
        DispatcherClient::new(settings.orchestrator_url.clone(), settings.api_token.clone())
            .context("failed to create dispatcher client")?,
    );
    let assets = Arc::new(
        AssetStore::new(settings.cache_dir.clone(), settings.asset_url.clone())
            .context("failed to initialize asset cache")?,
    );

    // 6) Detection thread
    let opts = PipelineOpts {
        room: settings.room_label().to_string(),
        wake_sound: settings.wake_sound.clone(),
        done_sound: settings.done_sound.clone(),
    };
    let detection_loop = DetectionLoop::new(
        Box::new(source),
        vad,
        wake,
        gate,
        recorder,
        dispatcher,
        assets,
        playback.clone(),
        opts,
        metrics.clone(),
    );
    let detection_handle = std::thread::Builder::new()
        .name("detection".to_string())
        .spawn(move || detection_loop.run())
        .context("failed to spawn detection thread")?;

    Ok(AppHandle {
        metrics,
        running,
        audio_capture,
        detection_handle,
        playback,
    })
}

/// Periodic one-line status for the log, driven from the supervisor task.
pub fn log_pipeline_stats(metrics: &PipelineMetrics) {
    tracing::info!(
        frames = metrics.detect_frames.load(Ordering::Relaxed),
        wake_hits = metrics.wake_hits.load(Ordering::Relaxed),
        confirmed = metrics.wake_confirmed.load(Ordering::Relaxed),
        rejected = metrics.wake_rejected.load(Ordering::Relaxed),
        recordings = metrics.recordings_completed.load(Ordering::Relaxed),
        dispatch_failures = metrics.dispatch_failures.load(Ordering::Relaxed),
        "Pipeline running"
    );
}
