use serde::{Deserialize, Serialize};

use super::constants::{FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};

/// High-level VAD configuration shared by the gate and the recorder.
///
/// `speech_threshold` is the single operating point for "this frame is
/// speech": the gate refreshes its last-voiced timestamp above it and the
/// recorder classifies frames against it. 0.5 is the documented Silero
/// operating point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    pub speech_threshold: f32,
    pub energy_floor_dbfs: f32,
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            speech_threshold: 0.5,
            energy_floor_dbfs: -55.0,
            frame_size_samples: FRAME_SIZE_SAMPLES,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }
}

impl VadConfig {
    pub fn frame_duration_ms(&self) -> f32 {
        (self.frame_size_samples as f32 * 1000.0) / self.sample_rate_hz as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_duration_is_32ms() {
        let cfg = VadConfig::default();
        assert!((cfg.frame_duration_ms() - 32.0).abs() < f32::EPSILON);
    }
}
