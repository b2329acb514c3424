use serde::{Deserialize, Serialize};

/// Engine-specific configuration for the Silero VAD wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SileroConfig {
    /// Frames with RMS energy below this floor score 0.0 regardless of the
    /// model output; suppresses phantom speech on near-silent input.
    pub energy_floor_dbfs: f32,
    pub window_size_samples: usize,
    pub sample_rate_hz: u32,
}

impl Default for SileroConfig {
    fn default() -> Self {
        Self {
            energy_floor_dbfs: -55.0,
            window_size_samples: 512,
            sample_rate_hz: 16_000,
        }
    }
}
