use std::time::Duration;

use base64::Engine as _;
use serde::Deserialize;

use crate::actions::Action;
use vigil_audio::wav;
use vigil_foundation::DispatchError;

const PROCESS_TIMEOUT: Duration = Duration::from_secs(30);
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(3);

/// Wire format of the orchestrator's processing response.
#[derive(Debug, Deserialize)]
pub struct OrchestratorResponse {
    pub status: String,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub response_text: Option<String>,
    #[serde(default)]
    pub audio_b64: Option<String>,
    #[serde(default)]
    pub actions: Vec<RawAction>,
}

/// An action as it appears on the wire; decoded once at this boundary.
#[derive(Debug, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Nothing usable came back (empty transcript or a dispatch fault);
    /// the loop resumes listening.
    Empty,
    Success,
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    pub transcription: Option<String>,
    pub response_text: Option<String>,
    pub response_audio: Option<Vec<u8>>,
    pub actions: Vec<Action>,
}

impl DispatchOutcome {
    pub fn empty() -> Self {
        Self {
            status: DispatchStatus::Empty,
            transcription: None,
            response_text: None,
            response_audio: None,
            actions: Vec::new(),
        }
    }

    fn from_response(body: OrchestratorResponse) -> Self {
        let status = if body.status == "empty" {
            DispatchStatus::Empty
        } else {
            DispatchStatus::Success
        };

        let response_audio = body.audio_b64.as_deref().and_then(|b64| {
            match base64::engine::general_purpose::STANDARD.decode(b64) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::error!("Failed to decode response audio: {}", e);
                    None
                }
            }
        });

        Self {
            status,
            transcription: body.transcription,
            response_text: body.response_text,
            response_audio,
            actions: body.actions.iter().map(Action::decode).collect(),
        }
    }
}

/// Blocking client for the orchestrator boundary. Request timeouts live
/// here, not in the capture core.
pub struct DispatcherClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_token: Option<String>,
}

impl DispatcherClient {
    pub fn new(base_url: String, api_token: Option<String>) -> Result<Self, DispatchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(PROCESS_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Send recorded command audio for processing. The recording moves in
    /// here; the caller is done with it either way.
    pub fn process(&self, samples: Vec<i16>, room: &str) -> Result<DispatchOutcome, DispatchError> {
        tracing::info!("Sending audio to orchestrator for processing...");

        let wav_bytes =
            wav::encode_wav_mono_16k(&samples).map_err(|e| DispatchError::Encode(e.to_string()))?;

        let part = reqwest::blocking::multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| DispatchError::Request(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("room", room.to_string());

        let mut request = self
            .http
            .post(format!("{}/process", self.base_url))
            .multipart(form);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
            });
        }

        let body: OrchestratorResponse = response
            .json()
            .map_err(|e| DispatchError::Malformed(e.to_string()))?;

        Ok(DispatchOutcome::from_response(body))
    }

    /// Tell the orchestrator a wake word fired (zone volume ducking).
    /// Fire-and-forget; failures are logged and swallowed.
    pub fn notify_wake(&self, room: &str) {
        self.notify_event("wakeword", room);
    }

    /// Tell the orchestrator the interaction finished (volume restore).
    pub fn notify_finished(&self, room: &str) {
        self.notify_event("finished", room);
    }

    fn notify_event(&self, event: &str, room: &str) {
        let mut request = self
            .http
            .post(format!("{}/event/{}", self.base_url, event))
            .timeout(NOTIFY_TIMEOUT)
            .form(&[("room", room)]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        match request.send() {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Notified orchestrator: {} ({})", event, room);
            }
            Ok(response) => {
                tracing::error!(
                    "Orchestrator {} notification returned {}",
                    event,
                    response.status()
                );
            }
            Err(e) => {
                tracing::error!("Failed to notify orchestrator of {}: {}", event, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;

    #[test]
    fn full_response_decodes_audio_and_actions() {
        let audio = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
        let json = format!(
            r#"{{
                "status": "success",
                "transcription": "turn it down",
                "response_text": "done",
                "audio_b64": "{}",
                "actions": [
                    {{"type": "set_volume", "payload": {{"level": 30}}}},
                    {{"type": "stop_audio", "payload": {{}}}}
                ]
            }}"#,
            audio
        );

        let body: OrchestratorResponse = serde_json::from_str(&json).unwrap();
        let outcome = DispatchOutcome::from_response(body);

        assert_eq!(outcome.status, DispatchStatus::Success);
        assert_eq!(outcome.transcription.as_deref(), Some("turn it down"));
        assert_eq!(outcome.response_audio.as_deref(), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(outcome.actions.len(), 2);
        assert!(matches!(outcome.actions[0], Action::SetVolume { level: 30 }));
        assert!(matches!(outcome.actions[1], Action::StopAudio));
    }

    #[test]
    fn minimal_empty_response_decodes() {
        let body: OrchestratorResponse = serde_json::from_str(r#"{"status": "empty"}"#).unwrap();
        let outcome = DispatchOutcome::from_response(body);
        assert_eq!(outcome.status, DispatchStatus::Empty);
        assert!(outcome.response_audio.is_none());
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn invalid_base64_audio_is_dropped_not_fatal() {
        let json = r#"{"status": "success", "audio_b64": "!!not-base64!!"}"#;
        let body: OrchestratorResponse = serde_json::from_str(json).unwrap();
        let outcome = DispatchOutcome::from_response(body);
        assert_eq!(outcome.status, DispatchStatus::Success);
        assert!(outcome.response_audio.is_none());
    }

    #[test]
    fn process_against_unreachable_host_is_a_request_fault() {
        // Discard port on loopback; connection refused immediately
        let client =
            DispatcherClient::new("http://127.0.0.1:9".to_string(), None).expect("client builds");
        let err = client.process(vec![0i16; 160], "kitchen").unwrap_err();
        assert!(matches!(err, DispatchError::Request(_)));
    }
}
