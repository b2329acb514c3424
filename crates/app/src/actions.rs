use std::process::Command;
use std::time::Duration;

use crate::assets::AssetStore;
use crate::dispatch::RawAction;
use vigil_audio::PlaybackEngine;

/// Local actions the orchestrator can request, decoded once at the wire
/// boundary and matched exhaustively from then on.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetVolume {
        level: i64,
    },
    PlayAudio {
        key: Option<String>,
        loop_duration: Option<Duration>,
    },
    StopAudio,
    Unknown(String),
}

impl Action {
    pub fn decode(raw: &RawAction) -> Action {
        match raw.kind.as_str() {
            "set_volume" => Action::SetVolume {
                level: raw
                    .payload
                    .get("level")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(50)
                    .clamp(0, 100),
            },
            "play_audio" => {
                let key = raw
                    .payload
                    .get("filename")
                    .or_else(|| raw.payload.get("audio_url"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let loop_duration = raw
                    .payload
                    .get("loop_duration")
                    .and_then(|v| v.as_u64())
                    .filter(|&secs| secs > 0)
                    .map(Duration::from_secs);
                Action::PlayAudio { key, loop_duration }
            }
            "stop_audio" => Action::StopAudio,
            other => Action::Unknown(other.to_string()),
        }
    }
}

/// Execute orchestrator-requested actions in order. Failures are logged;
/// nothing here can take down the capture path.
pub fn execute(action: Action, assets: &AssetStore, playback: &PlaybackEngine) {
    match action {
        Action::SetVolume { level } => {
            tracing::info!("Setting local volume to {}%", level);
            match Command::new("amixer")
                .args(["set", "Master", &format!("{}%", level)])
                .status()
            {
                Ok(status) if status.success() => {}
                Ok(status) => tracing::error!("amixer exited with {}", status),
                Err(e) => tracing::error!("Failed to run amixer: {}", e),
            }
        }
        Action::PlayAudio { key, loop_duration } => {
            let Some(key) = key else {
                tracing::warn!("play_audio action without filename or audio_url");
                return;
            };
            tracing::info!(
                "Playing sound {} (loop: {:?})",
                key,
                loop_duration.map(|d| d.as_secs())
            );
            match assets.fetch(&key) {
                Ok(path) => playback.play_wav_file(&path, loop_duration),
                Err(e) => tracing::error!("Failed to fetch audio asset {}: {}", key, e),
            }
        }
        Action::StopAudio => {
            tracing::info!("Stopping audio playback on request");
            playback.stop();
        }
        Action::Unknown(kind) => {
            tracing::warn!("Unknown action type received: {}", kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: &str, payload: serde_json::Value) -> RawAction {
        serde_json::from_value(json!({ "type": kind, "payload": payload })).unwrap()
    }

    #[test]
    fn set_volume_decodes_and_clamps() {
        assert_eq!(
            Action::decode(&raw("set_volume", json!({"level": 70}))),
            Action::SetVolume { level: 70 }
        );
        assert_eq!(
            Action::decode(&raw("set_volume", json!({"level": 250}))),
            Action::SetVolume { level: 100 }
        );
        assert_eq!(
            Action::decode(&raw("set_volume", json!({"level": -3}))),
            Action::SetVolume { level: 0 }
        );
        // Missing level falls back to the midpoint
        assert_eq!(
            Action::decode(&raw("set_volume", json!({}))),
            Action::SetVolume { level: 50 }
        );
    }

    #[test]
    fn play_audio_accepts_filename_or_url() {
        let a = Action::decode(&raw(
            "play_audio",
            json!({"filename": "chime.wav", "loop_duration": 10}),
        ));
        assert_eq!(
            a,
            Action::PlayAudio {
                key: Some("chime.wav".into()),
                loop_duration: Some(Duration::from_secs(10)),
            }
        );

        let a = Action::decode(&raw("play_audio", json!({"audio_url": "alarm.wav"})));
        assert_eq!(
            a,
            Action::PlayAudio {
                key: Some("alarm.wav".into()),
                loop_duration: None,
            }
        );
    }

    #[test]
    fn zero_loop_duration_means_play_once() {
        let a = Action::decode(&raw(
            "play_audio",
            json!({"filename": "x.wav", "loop_duration": 0}),
        ));
        assert_eq!(
            a,
            Action::PlayAudio {
                key: Some("x.wav".into()),
                loop_duration: None,
            }
        );
    }

    #[test]
    fn unrecognized_types_become_unknown() {
        let a = Action::decode(&raw("start_disco", json!({"bpm": 128})));
        assert_eq!(a, Action::Unknown("start_disco".into()));
    }
}
