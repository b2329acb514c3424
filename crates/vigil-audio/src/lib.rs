pub mod capture;
pub mod device;
pub mod frame_reader;
pub mod playback;
pub mod resampler;
pub mod ring_buffer;
pub mod source;
pub mod watchdog;
pub mod wav;

// Public API
pub use capture::{AudioCaptureThread, DeviceConfig};
pub use device::{DeviceInfo, DeviceManager};
pub use frame_reader::FrameReader;
pub use playback::{PlaybackConfig, PlaybackEngine, PlaybackRequest};
pub use resampler::{ResamplerQuality, StreamResampler};
pub use ring_buffer::AudioRingBuffer;
pub use source::{CaptureFrameSource, FrameSource, SourceConfig};
pub use watchdog::WatchdogTimer;

use std::time::Instant;

/// One fixed-size block of mono 16 kHz PCM on the detection path.
///
/// Timestamps are reconstructed from the running sample count, not the wall
/// clock, so consumers downstream can be driven deterministically.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub timestamp: Instant,
    pub sample_rate: u32,
}
