use crate::config::SileroConfig;
use vigil_vad::VadEngine;
use voice_activity_detector::VoiceActivityDetector;

pub struct SileroEngine {
    detector: VoiceActivityDetector,
    config: SileroConfig,
    frames_processed: u64,
    last_probability: f32,
}

impl SileroEngine {
    pub fn new(config: SileroConfig) -> Result<Self, String> {
        let detector = build_detector(&config)?;
        Ok(Self {
            detector,
            config,
            frames_processed: 0,
            last_probability: 0.0,
        })
    }

    pub fn last_probability(&self) -> f32 {
        self.last_probability
    }
}

fn build_detector(config: &SileroConfig) -> Result<VoiceActivityDetector, String> {
    VoiceActivityDetector::builder()
        .sample_rate(config.sample_rate_hz as i64)
        .chunk_size(config.window_size_samples)
        .build()
        .map_err(|e| format!("Failed to create Silero VAD: {}", e))
}

impl VadEngine for SileroEngine {
    fn score(&mut self, frame: &[i16]) -> Result<f32, String> {
        if frame.len() != self.config.window_size_samples {
            return Err(format!(
                "Silero VAD requires {} samples, got {}",
                self.config.window_size_samples,
                frame.len()
            ));
        }

        let energy_dbfs = calculate_energy_dbfs(frame);
        let mut probability = self.detector.predict(frame.iter().copied());

        if energy_dbfs < self.config.energy_floor_dbfs {
            probability = 0.0;
        }

        self.last_probability = probability;
        self.frames_processed += 1;

        Ok(probability)
    }

    fn reset(&mut self) {
        // The registry crate keeps its recurrent state private; a fresh
        // detector is the reset.
        match build_detector(&self.config) {
            Ok(detector) => self.detector = detector,
            Err(e) => tracing::error!("Silero VAD reset failed, keeping stale state: {}", e),
        }
        self.frames_processed = 0;
        self.last_probability = 0.0;
    }

    fn required_sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn required_frame_size_samples(&self) -> usize {
        self.config.window_size_samples
    }
}

fn calculate_energy_dbfs(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return -96.0; // Return a very low dBFS for empty frames
    }
    let sum_sq = frame.iter().map(|&s| (s as f64).powi(2)).sum::<f64>();
    let rms = (sum_sq / frame.len() as f64).sqrt();

    if rms == 0.0 {
        return -96.0; // Log of zero is undefined, return a low value
    }

    // Convert RMS to dBFS, where 0 dBFS is the max possible level for i16
    20.0 * (rms / i16::MAX as f64).log10() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silero_engine_creates_and_reports_requirements() {
        let cfg = SileroConfig::default();
        let engine = SileroEngine::new(cfg).expect("SileroEngine should create successfully");
        assert_eq!(engine.required_sample_rate(), 16000);
        assert_eq!(engine.required_frame_size_samples(), 512);
    }

    #[test]
    fn silero_engine_scores_silence_near_zero() {
        let cfg = SileroConfig::default();
        let mut engine = SileroEngine::new(cfg).expect("SileroEngine should create successfully");
        let silence = vec![0i16; 512];
        let prob = engine.score(&silence).expect("Scoring should succeed");
        assert_eq!(prob, 0.0, "energy floor should clamp silence to 0.0");
    }

    #[test]
    fn silero_engine_rejects_incorrect_frame_sizes() {
        let cfg = SileroConfig::default();
        let mut engine = SileroEngine::new(cfg).expect("SileroEngine should create successfully");
        let too_short = vec![0i16; 511];
        let too_long = vec![0i16; 513];
        let err_short = engine.score(&too_short).unwrap_err();
        let err_long = engine.score(&too_long).unwrap_err();
        assert!(
            err_short.contains("512"),
            "Error should mention required frame size: {err_short}"
        );
        assert!(
            err_long.contains("512"),
            "Error should mention required frame size: {err_long}"
        );
    }

    #[test]
    fn reset_clears_counters() {
        let cfg = SileroConfig::default();
        let mut engine = SileroEngine::new(cfg).expect("SileroEngine should create successfully");
        let silence = vec![0i16; 512];
        let _ = engine.score(&silence).unwrap();
        engine.reset();
        assert_eq!(engine.last_probability(), 0.0);
    }
}
