use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

#[derive(Debug, Clone, Copy)]
pub enum ResamplerQuality {
    Fast,     // Lower quality, lower CPU usage
    Balanced, // Default quality/performance balance
    Quality,  // Higher quality, higher CPU usage
}

/// Streaming resampler for mono i16 audio using Rubato's sinc interpolation.
///
/// - Maintains internal buffers to handle arbitrary-sized input chunks
/// - Automatically handles buffering for Rubato's fixed chunk requirements
pub struct StreamResampler {
    in_rate: u32,
    out_rate: u32,
    resampler: SincFixedIn<f32>,
    input_buffer: Vec<f32>,
    output_buffer: Vec<f32>,
    chunk_size: usize,
}

impl StreamResampler {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        Self::new_with_quality(in_rate, out_rate, ResamplerQuality::Balanced)
    }

    pub fn new_with_quality(in_rate: u32, out_rate: u32, quality: ResamplerQuality) -> Self {
        // 512 samples at 16kHz = 32ms, aligned with the detection frame size
        let chunk_size = 512;

        let sinc_params = match quality {
            ResamplerQuality::Fast => SincInterpolationParameters {
                sinc_len: 32,
                f_cutoff: 0.92,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 64,
                window: WindowFunction::Blackman,
            },
            ResamplerQuality::Balanced => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 128,
                window: WindowFunction::Blackman2,
            },
            ResamplerQuality::Quality => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.97,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
        };

        let resampler = SincFixedIn::<f32>::new(
            out_rate as f64 / in_rate as f64,
            2.0,
            sinc_params,
            chunk_size,
            1, // mono
        )
        .expect("Failed to create Rubato resampler");

        Self {
            in_rate,
            out_rate,
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            output_buffer: Vec::new(),
            chunk_size,
        }
    }

    /// Process an arbitrary chunk of mono i16 samples.
    /// Returns a freshly allocated Vec with resampled i16 at out_rate.
    pub fn process(&mut self, input: &[i16]) -> Vec<i16> {
        if self.in_rate == self.out_rate {
            // Fast path: just clone input
            return input.to_vec();
        }

        for &sample in input {
            self.input_buffer.push(sample as f32 / 32768.0);
        }

        while self.input_buffer.len() >= self.chunk_size {
            // Rubato expects Vec<Vec<f32>> for channels
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            let input_frames = vec![chunk];

            let output_frames = match self.resampler.process(&input_frames, None) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::error!("Resampler error: {}", e);
                    // Return empty on error to maintain stream continuity
                    return Vec::new();
                }
            };

            if !output_frames.is_empty() && !output_frames[0].is_empty() {
                self.output_buffer.extend_from_slice(&output_frames[0]);
            }
        }

        let mut result = Vec::with_capacity(self.output_buffer.len());
        for &sample in &self.output_buffer {
            let clamped = sample.clamp(-1.0, 1.0);
            result.push((clamped * 32767.0).round() as i16);
        }

        self.output_buffer.clear();

        result
    }

    /// Reset internal state, clearing buffers and resetting the resampler.
    pub fn reset(&mut self) {
        self.input_buffer.clear();
        self.output_buffer.clear();
        self.resampler.reset();
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsample_48k_to_16k_ramp() {
        let mut rs = StreamResampler::new(48_000, 16_000);
        let n_in = 4_800;
        let input: Vec<i16> = (0..n_in).map(|i| (i % 32768) as i16).collect();

        // Process in chunks to test buffering
        let mut all_output = Vec::new();
        for chunk in input.chunks(1000) {
            all_output.extend(rs.process(chunk));
        }

        // Approximately 1/3 of the input samples, minus filter latency
        assert!(
            all_output.len() >= 1400 && all_output.len() <= 1700,
            "Expected ~1600 samples, got {}",
            all_output.len()
        );
    }

    #[test]
    fn upsample_16k_to_44k1_produces_more_samples() {
        let mut rs = StreamResampler::new(16_000, 44_100);
        let input = vec![1000i16; 1600]; // 100ms at 16kHz

        let mut out = rs.process(&input);
        out.extend(rs.process(&input));

        // Two 100ms blocks upsampled ~2.76x; allow for filter latency
        assert!(
            out.len() > 6000,
            "Expected several thousand samples, got {}",
            out.len()
        );
    }

    #[test]
    fn passthrough_same_rate() {
        let mut rs = StreamResampler::new(16_000, 16_000);
        let input = vec![100i16, 200, 300, 400, 500];
        let output = rs.process(&input);
        assert_eq!(input, output, "Passthrough should return identical data");
    }

    #[test]
    fn process_with_all_quality_presets() {
        let input: Vec<i16> = (0..4096).map(|i| ((i % 100) as i16) - 50).collect();
        for q in [
            ResamplerQuality::Fast,
            ResamplerQuality::Balanced,
            ResamplerQuality::Quality,
        ] {
            let mut rs = StreamResampler::new_with_quality(48_000, 16_000, q);
            let mut out = rs.process(&input);
            out.extend(rs.process(&input));
            assert!(!out.is_empty());
        }
    }
}
