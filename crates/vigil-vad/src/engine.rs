/// A trait for Voice Activity Detection (VAD) engines.
///
/// Implementations are stateful scorers: recurrent state carries across
/// calls and belongs exclusively to one instance. `reset` returns the
/// engine to its initial state at interaction-cycle boundaries.
pub trait VadEngine: Send {
    /// Score one frame, returning speech probability in `[0.0, 1.0]`.
    fn score(&mut self, frame: &[i16]) -> Result<f32, String>;
    fn reset(&mut self);
    fn required_sample_rate(&self) -> u32;
    fn required_frame_size_samples(&self) -> usize;
}
