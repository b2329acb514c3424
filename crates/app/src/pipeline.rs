use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::actions;
use crate::assets::AssetStore;
use crate::dispatch::{DispatchOutcome, DispatcherClient};
use crate::gate::{GateDecision, WakeGate};
use crate::recorder::{CommandRecorder, StopReason};
use vigil_audio::{FrameSource, PlaybackEngine};
use vigil_telemetry::{PipelineMetrics, PipelineStage};
use vigil_vad::VadEngine;
use vigil_wake::WakeEngine;

pub struct PipelineOpts {
    pub room: String,
    pub wake_sound: Option<PathBuf>,
    pub done_sound: Option<PathBuf>,
}

/// The single logical loop over the frame source: every frame updates VAD
/// state and feeds the wake-word accumulator; a confirmed wake event runs
/// one synchronous interaction cycle, then all detector state resets and
/// listening resumes. Nothing in here may terminate the process; only the
/// shutdown signal (which quiesces the source) ends the loop.
pub struct DetectionLoop {
    source: Box<dyn FrameSource>,
    vad: Box<dyn VadEngine>,
    wake: Box<dyn WakeEngine>,
    gate: WakeGate,
    recorder: CommandRecorder,
    dispatcher: Arc<DispatcherClient>,
    assets: Arc<AssetStore>,
    playback: Arc<PlaybackEngine>,
    opts: PipelineOpts,
    metrics: Arc<PipelineMetrics>,
}

impl DetectionLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        vad: Box<dyn VadEngine>,
        wake: Box<dyn WakeEngine>,
        gate: WakeGate,
        recorder: CommandRecorder,
        dispatcher: Arc<DispatcherClient>,
        assets: Arc<AssetStore>,
        playback: Arc<PlaybackEngine>,
        opts: PipelineOpts,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            source,
            vad,
            wake,
            gate,
            recorder,
            dispatcher,
            assets,
            playback,
            opts,
            metrics,
        }
    }

    pub fn run(mut self) {
        tracing::info!("Satellite started. Room: {}", self.opts.room);

        loop {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Frame read failed: {}", e);
                    self.metrics.capture_errors.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            self.metrics.increment_detect_frames();
            self.metrics.mark_stage_active(PipelineStage::Detect);

            let probability = match self.vad.score(&frame.samples) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("VAD scoring failed, dropping frame: {}", e);
                    self.metrics.detector_errors.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };
            self.gate.observe_vad(probability, frame.timestamp);

            let decision =
                self.gate
                    .push_frame(&frame.samples, frame.timestamp, self.wake.as_mut());

            match decision {
                Some(GateDecision::Confirmed(event)) => {
                    tracing::info!(
                        "Wake word detected! (confidence: {:.2}, model: {})",
                        event.confidence,
                        event.model_id
                    );
                    self.metrics.record_wake_hit(true);

                    self.run_interaction();

                    // Reset every detector and the gate before resuming
                    self.vad.reset();
                    self.wake.reset();
                    self.gate.reset();
                    tracing::info!("Listening for wakeword...");
                }
                Some(GateDecision::Rejected(event)) => {
                    self.metrics.record_wake_hit(false);
                    tracing::debug!(
                        "Wake hit rejected by VAD gate (confidence: {:.2})",
                        event.confidence
                    );
                }
                None => {}
            }
        }

        tracing::info!("Detection loop stopped");
    }

    /// One wake-to-response cycle. Intentionally synchronous: the satellite
    /// is idle while awaiting the orchestrator, so no wake detection is
    /// lost during the bounded dispatch call.
    fn run_interaction(&mut self) {
        let room = self.opts.room.clone();

        self.dispatcher.notify_wake(&room);
        if let Some(cue) = &self.opts.wake_sound {
            self.playback.play_wav_file(cue, None);
        }

        self.metrics.is_recording.store(true, Ordering::Relaxed);
        let recording = self
            .recorder
            .record(self.source.as_mut(), self.vad.as_mut());
        self.metrics.is_recording.store(false, Ordering::Relaxed);

        match recording.stop {
            StopReason::Silence | StopReason::MaxDuration => {
                self.metrics
                    .recordings_completed
                    .fetch_add(1, Ordering::Relaxed);
            }
            StopReason::NoSpeech | StopReason::SourceEnded => {
                self.metrics
                    .recordings_aborted
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        if recording.is_empty() {
            tracing::info!("Nothing recorded, resuming listening.");
            self.dispatcher.notify_finished(&room);
            return;
        }

        if let Some(cue) = &self.opts.done_sound {
            self.playback.play_wav_file(cue, None);
        }

        let outcome = match self.dispatcher.process(recording.samples, &room) {
            Ok(outcome) => outcome,
            Err(e) => {
                // A dispatch fault is indistinguishable from an empty
                // transcript as far as the loop is concerned.
                tracing::error!("Dispatch failed: {}", e);
                self.metrics.dispatch_failures.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::empty()
            }
        };

        if let Some(text) = &outcome.transcription {
            tracing::info!("Transcribed: {}", text);
        }
        if let Some(audio) = &outcome.response_audio {
            self.playback.play_wav_bytes(audio);
        }
        for action in outcome.actions {
            actions::execute(action, &self.assets, &self.playback);
        }

        self.dispatcher.notify_finished(&room);
    }
}
