use serde::{Deserialize, Serialize};

/// Gate-side wake-word configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeConfig {
    /// Confidence at or above which a chunk arms the gate.
    pub wakeword_threshold: f32,
    /// Maximum gap between last detected speech and a wake hit for the hit
    /// to be trusted, in milliseconds.
    pub gate_timeout_ms: u64,
    /// When false, wake hits confirm on score alone (no VAD gating).
    pub vad_gate_enabled: bool,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            wakeword_threshold: 0.6,
            gate_timeout_ms: 800,
            vad_gate_enabled: true,
        }
    }
}
