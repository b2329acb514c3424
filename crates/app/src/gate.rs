use std::time::{Duration, Instant};

use vigil_wake::{WakeConfig, WakeEngine};

/// A wake hit that cleared the confidence threshold; consumed immediately
/// by the gate decision, never persisted.
#[derive(Debug, Clone)]
pub struct WakeEvent {
    pub confidence: f32,
    pub timestamp: Instant,
    pub model_id: String,
}

#[derive(Debug)]
pub enum GateDecision {
    /// Wake hit backed by recent speech (or gating disabled); start recording.
    Confirmed(WakeEvent),
    /// Wake hit with no recent speech behind it; stay in the listening loop.
    Rejected(WakeEvent),
}

/// Fuses VAD and wake-word signals: `Idle -> Armed -> Confirmed | Rejected`.
///
/// Wake-word models alone produce periodic false triggers on silence and
/// noise; requiring VAD activity within `gate_timeout` of the hit cuts
/// false confirmations without adding detection latency. The cost is
/// rejecting wake words spoken after a long pause, bounded by the timeout.
pub struct WakeGate {
    cfg: WakeConfig,
    speech_threshold: f32,
    chunk_samples: usize,
    chunk: Vec<i16>,
    last_voiced_at: Option<Instant>,
}

impl WakeGate {
    pub fn new(cfg: WakeConfig, speech_threshold: f32, chunk_samples: usize) -> Self {
        assert!(chunk_samples > 0, "wake chunk size must be positive");
        Self {
            cfg,
            speech_threshold,
            chunk_samples,
            chunk: Vec::with_capacity(chunk_samples * 2),
            last_voiced_at: None,
        }
    }

    /// Refresh the last-voiced timestamp from a per-frame VAD score.
    pub fn observe_vad(&mut self, probability: f32, at: Instant) {
        if probability > self.speech_threshold {
            self.last_voiced_at = Some(at);
        }
    }

    pub fn last_voiced_at(&self) -> Option<Instant> {
        self.last_voiced_at
    }

    /// Accumulate a frame toward the next wake chunk; score full chunks.
    ///
    /// Returns a decision only when a chunk arms the gate. Either outcome
    /// resets the wake engine so one detection cannot bleed into the next.
    /// A scoring fault drops the chunk and the loop continues.
    pub fn push_frame(
        &mut self,
        samples: &[i16],
        at: Instant,
        wake: &mut dyn WakeEngine,
    ) -> Option<GateDecision> {
        self.chunk.extend_from_slice(samples);

        while self.chunk.len() >= self.chunk_samples {
            let chunk: Vec<i16> = self.chunk.drain(..self.chunk_samples).collect();

            let hit = match wake.score(&chunk) {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!("Wake scoring failed, dropping chunk: {}", e);
                    continue;
                }
            };

            let Some(hit) = hit else { continue };
            if hit.confidence < self.cfg.wakeword_threshold {
                continue;
            }

            // Armed: decide immediately against the VAD window
            let event = WakeEvent {
                confidence: hit.confidence,
                timestamp: at,
                model_id: hit.model_id,
            };
            wake.reset();
            self.chunk.clear();

            return Some(if self.speech_recent(at) {
                GateDecision::Confirmed(event)
            } else {
                tracing::debug!(
                    confidence = event.confidence,
                    "Wake hit rejected: no recent speech activity"
                );
                GateDecision::Rejected(event)
            });
        }

        None
    }

    fn speech_recent(&self, at: Instant) -> bool {
        if !self.cfg.vad_gate_enabled {
            return true;
        }
        match self.last_voiced_at {
            Some(voiced) => {
                at.duration_since(voiced) <= Duration::from_millis(self.cfg.gate_timeout_ms)
            }
            None => false,
        }
    }

    /// Clear accumulated audio and the VAD window for the next cycle.
    pub fn reset(&mut self) {
        self.chunk.clear();
        self.last_voiced_at = None;
    }
}
