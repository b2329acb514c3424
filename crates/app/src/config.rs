use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use vigil_audio::ResamplerQuality;

/// Full settings surface. Precedence: CLI > environment (`VIGIL_*`) >
/// defaults. Everything here is a read-only input to the pipeline,
/// supplied once at startup.
#[derive(Parser, Debug, Clone)]
#[command(name = "vigil", version, about = "Always-listening voice satellite")]
pub struct Settings {
    /// Capture device name (host default when omitted)
    #[arg(long, env = "VIGIL_INPUT_DEVICE")]
    pub input_device: Option<String>,

    /// Playback device name (host default when omitted)
    #[arg(long, env = "VIGIL_OUTPUT_DEVICE")]
    pub output_device: Option<String>,

    /// Path to the wake-word model file
    #[arg(long, env = "VIGIL_WAKE_MODEL")]
    pub wake_model: String,

    /// Wake confidence threshold (0.0-1.0). Higher = fewer false positives.
    #[arg(long, env = "VIGIL_WAKEWORD_THRESHOLD", default_value_t = 0.6)]
    pub wakeword_threshold: f32,

    /// VAD speech probability threshold (0.0-1.0)
    #[arg(long, env = "VIGIL_SPEECH_THRESHOLD", default_value_t = 0.5)]
    pub speech_threshold: f32,

    /// Disable VAD gating of wake hits (confirm on wake score alone)
    #[arg(long, env = "VIGIL_NO_VAD_GATE")]
    pub no_vad_gate: bool,

    /// Maximum gap between last detected speech and a wake hit, in ms
    #[arg(long, env = "VIGIL_GATE_TIMEOUT_MS", default_value_t = 800)]
    pub gate_timeout_ms: u64,

    /// Silence duration after which command recording stops, in seconds
    #[arg(long, env = "VIGIL_SILENCE_TIMEOUT_SECS", default_value_t = 2.0)]
    pub silence_timeout_secs: f64,

    /// Hard cap on command recording length, in seconds
    #[arg(long, env = "VIGIL_MAX_COMMAND_SECS", default_value_t = 15.0)]
    pub max_command_secs: f64,

    /// Physical location of this satellite, sent with every dispatch
    #[arg(long, env = "VIGIL_ROOM")]
    pub room: Option<String>,

    /// Base URL of the orchestrator
    #[arg(long, env = "VIGIL_ORCHESTRATOR_URL", default_value = "http://localhost:8000")]
    pub orchestrator_url: String,

    /// Bearer token for the orchestrator
    #[arg(long, env = "VIGIL_API_TOKEN")]
    pub api_token: Option<String>,

    /// Base URL for remote audio assets
    #[arg(long, env = "VIGIL_ASSET_URL")]
    pub asset_url: Option<String>,

    /// Local cache directory for fetched assets
    #[arg(long, env = "VIGIL_CACHE_DIR", default_value = "./cache")]
    pub cache_dir: PathBuf,

    /// Playback sample rate in Hz
    #[arg(long, env = "VIGIL_OUTPUT_RATE", default_value_t = 44_100)]
    pub output_rate: u32,

    /// Playback channel count
    #[arg(long, env = "VIGIL_OUTPUT_CHANNELS", default_value_t = 1)]
    pub output_channels: u16,

    /// Silence prepended to playback so output hardware can wake up, in ms
    #[arg(long, env = "VIGIL_OUTPUT_DELAY_MS", default_value_t = 0)]
    pub output_delay_ms: u64,

    /// WAV played when the wake word is confirmed
    #[arg(long, env = "VIGIL_WAKE_SOUND")]
    pub wake_sound: Option<PathBuf>,

    /// WAV played when command capture completes
    #[arg(long, env = "VIGIL_DONE_SOUND")]
    pub done_sound: Option<PathBuf>,

    /// Capture resampler quality preset
    #[arg(long, env = "VIGIL_RESAMPLER_QUALITY", value_enum, default_value = "balanced")]
    pub resampler_quality: QualityArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Fast,
    Balanced,
    Quality,
}

impl From<QualityArg> for ResamplerQuality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::Fast => ResamplerQuality::Fast,
            QualityArg::Balanced => ResamplerQuality::Balanced,
            QualityArg::Quality => ResamplerQuality::Quality,
        }
    }
}

impl Settings {
    pub fn silence_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.silence_timeout_secs)
    }

    pub fn max_command_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_command_secs)
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    pub fn output_delay(&self) -> Duration {
        Duration::from_millis(self.output_delay_ms)
    }

    pub fn room_label(&self) -> &str {
        self.room.as_deref().unwrap_or("unknown")
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.wakeword_threshold) {
            return Err(format!(
                "wakeword-threshold must be in 0.0-1.0, got {}",
                self.wakeword_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.speech_threshold) {
            return Err(format!(
                "speech-threshold must be in 0.0-1.0, got {}",
                self.speech_threshold
            ));
        }
        if self.silence_timeout_secs <= 0.0 {
            return Err("silence-timeout-secs must be positive".into());
        }
        if self.max_command_secs <= 0.0 {
            return Err("max-command-secs must be positive".into());
        }
        if self.output_channels == 0 {
            return Err("output-channels must be at least 1".into());
        }
        Ok(())
    }
}
