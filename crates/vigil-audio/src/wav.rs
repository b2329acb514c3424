use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::playback::PlaybackRequest;
use vigil_foundation::AudioError;

/// Decode an in-memory WAV into a playback request (16-bit and float
/// sources supported; anything else is a decode fault).
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<PlaybackRequest, AudioError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::Decode(format!("invalid WAV: {}", e)))?;
    let spec = reader.spec();

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(format!("WAV sample read failed: {}", e)))?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0).round() as i16))
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(format!("WAV sample read failed: {}", e)))?,
        (fmt, bits) => {
            return Err(AudioError::Decode(format!(
                "unsupported WAV format: {:?}/{} bits",
                fmt, bits
            )));
        }
    };

    Ok(PlaybackRequest {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        loop_for: None,
    })
}

pub fn decode_wav_file(path: &Path) -> Result<PlaybackRequest, AudioError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AudioError::Decode(format!("cannot read {}: {}", path.display(), e)))?;
    decode_wav_bytes(&bytes)
}

/// Encode mono 16 kHz PCM as an in-memory WAV for dispatch.
pub fn encode_wav_mono_16k(samples: &[i16]) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::Decode(format!("WAV writer failed: {}", e)))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| AudioError::Decode(format!("WAV write failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Decode(format!("WAV finalize failed: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_samples() {
        let samples: Vec<i16> = (0..1000).map(|i| (i * 17 % 3000) as i16 - 1500).collect();
        let bytes = encode_wav_mono_16k(&samples).unwrap();

        let req = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(req.sample_rate, 16_000);
        assert_eq!(req.channels, 1);
        assert_eq!(req.samples, samples);
    }

    #[test]
    fn garbage_bytes_are_a_decode_fault() {
        let err = decode_wav_bytes(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn missing_file_is_a_decode_fault() {
        let err = decode_wav_file(Path::new("/nonexistent/cue.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)));
    }
}
