use rustpotter::{Rustpotter, RustpotterConfig, SampleFormat};
use vigil_wake::{WakeEngine, WakeHit};

pub struct RustpotterEngine {
    detector: Rustpotter,
    model_path: String,
    config: RustpotterConfig,
    convert_buf: Vec<f32>,
}

impl RustpotterEngine {
    /// Load a wake-word model from disk. `threshold` here is the detector's
    /// own floor; the gate applies its configured threshold on top of the
    /// returned confidence.
    pub fn new(model_path: &str, sample_rate: usize, threshold: f32) -> Result<Self, String> {
        let mut config = RustpotterConfig::default();
        config.fmt.sample_rate = sample_rate;
        config.fmt.channels = 1;
        config.fmt.sample_format = SampleFormat::F32;
        config.detector.threshold = threshold;

        let detector = build_detector(&config, model_path)?;

        tracing::info!("Wake word detector loaded from {model_path}");
        Ok(Self {
            detector,
            model_path: model_path.to_string(),
            config,
            convert_buf: Vec::new(),
        })
    }
}

fn build_detector(config: &RustpotterConfig, model_path: &str) -> Result<Rustpotter, String> {
    let mut detector = Rustpotter::new(config)
        .map_err(|e| format!("Failed to create rustpotter detector: {}", e))?;
    detector
        .add_wakeword_from_file("wakeword", model_path)
        .map_err(|e| format!("Failed to load wake word model {}: {}", model_path, e))?;
    Ok(detector)
}

impl WakeEngine for RustpotterEngine {
    fn score(&mut self, chunk: &[i16]) -> Result<Option<WakeHit>, String> {
        let expected = self.detector.get_samples_per_frame();
        if chunk.len() != expected {
            return Err(format!(
                "rustpotter requires {} samples per chunk, got {}",
                expected,
                chunk.len()
            ));
        }

        self.convert_buf.clear();
        self.convert_buf
            .extend(chunk.iter().map(|&s| s as f32 / 32768.0));

        Ok(self
            .detector
            .process_samples(self.convert_buf.clone())
            .map(|detection| WakeHit {
                confidence: detection.score,
                model_id: detection.name,
            }))
    }

    fn reset(&mut self) {
        // The detector's sliding audio window is private; a fresh instance
        // is the reset. Only runs at armed-decision boundaries.
        match build_detector(&self.config, &self.model_path) {
            Ok(detector) => self.detector = detector,
            Err(e) => tracing::error!("Wake detector reset failed, keeping stale state: {}", e),
        }
    }

    fn chunk_samples(&self) -> usize {
        self.detector.get_samples_per_frame()
    }
}
