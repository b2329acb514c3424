use std::time::Instant;

use super::ring_buffer::AudioConsumer;

/// A block of raw device samples as captured, before downmix/resampling.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub samples: Vec<i16>,
    pub timestamp: Instant,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Reads audio from the capture ring buffer and reconstructs metadata.
///
/// Timestamps are derived from the running sample count so that downstream
/// state machines see a deterministic clock.
pub struct FrameReader {
    consumer: AudioConsumer,
    sample_rate: u32,
    channels: u16,
    samples_read: u64,
    start_time: Instant,
}

impl FrameReader {
    pub fn new(consumer: AudioConsumer, sample_rate: u32, channels: u16) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            samples_read: 0,
            start_time: Instant::now(),
        }
    }

    /// Apply a device configuration change (capture restart on a new device).
    pub fn update_device_config(&mut self, sample_rate: u32, channels: u16) {
        if self.sample_rate != sample_rate || self.channels != channels {
            tracing::info!(
                "Frame reader reconfigured: {}Hz {}ch -> {}Hz {}ch",
                self.sample_rate,
                self.channels,
                sample_rate,
                channels
            );
            self.sample_rate = sample_rate;
            self.channels = channels;
        }
    }

    /// Read the next block of raw samples, up to `max_samples`.
    pub fn read_frame(&mut self, max_samples: usize) -> Option<RawFrame> {
        let mut buffer = vec![0i16; max_samples];
        let samples_read = self.consumer.read(&mut buffer);

        if samples_read == 0 {
            return None;
        }

        buffer.truncate(samples_read);

        // Per-channel sample position drives the timestamp
        let elapsed_samples = self.samples_read / self.channels.max(1) as u64;
        let elapsed_ms = (elapsed_samples * 1000) / self.sample_rate as u64;
        let timestamp = self.start_time + std::time::Duration::from_millis(elapsed_ms);

        self.samples_read += samples_read as u64;

        Some(RawFrame {
            samples: buffer,
            timestamp,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    /// Check how many samples are available to read
    pub fn available_samples(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::AudioRingBuffer;

    #[test]
    fn read_frame_returns_none_when_empty() {
        let rb = AudioRingBuffer::new(64);
        let (_prod, cons) = rb.split();
        let mut reader = FrameReader::new(cons, 16_000, 1);
        assert!(reader.read_frame(32).is_none());
    }

    #[test]
    fn timestamps_advance_with_sample_count() {
        let rb = AudioRingBuffer::new(65536);
        let (mut prod, cons) = rb.split();
        let mut reader = FrameReader::new(cons, 16_000, 1);

        // One second of audio in two reads
        prod.write(&vec![0i16; 16_000]).unwrap();
        let first = reader.read_frame(8_000).unwrap();
        let second = reader.read_frame(8_000).unwrap();

        let gap = second.timestamp.duration_since(first.timestamp);
        assert_eq!(gap.as_millis(), 500);
    }

    #[test]
    fn stereo_sample_count_halves_the_clock() {
        let rb = AudioRingBuffer::new(65536);
        let (mut prod, cons) = rb.split();
        let mut reader = FrameReader::new(cons, 16_000, 2);

        prod.write(&vec![0i16; 32_000]).unwrap();
        let first = reader.read_frame(16_000).unwrap();
        let second = reader.read_frame(16_000).unwrap();

        // 16k interleaved stereo samples = 8k per-channel = 500ms
        let gap = second.timestamp.duration_since(first.timestamp);
        assert_eq!(gap.as_millis(), 500);
    }
}
