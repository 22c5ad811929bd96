//! Narration audio rendered by ElevenLabs text-to-speech.

use crate::error::StageError;
use crate::models::PipelineState;
use crate::outputs::write_bytes;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};

const ELEVENLABS_API: &str = "https://api.elevenlabs.io";
const MODEL_ID: &str = "eleven_multilingual_v2";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

/// Delivery settings tuned for an energetic news read.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceSettings {
    /// Lower is more expressive, higher is steadier.
    pub stability: f32,
    pub similarity_boost: f32,
    /// Higher is more performative.
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.25,
            similarity_boost: 0.8,
            style: 0.6,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

/// ElevenLabs client bound to one voice.
#[derive(Debug, Clone)]
pub struct ElevenLabs {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    settings: VoiceSettings,
    base_url: String,
}

impl ElevenLabs {
    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            settings: VoiceSettings::default(),
            base_url: ELEVENLABS_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Render `text` to MP3 bytes.
    #[instrument(level = "info", skip_all, fields(voice = %self.voice_id, chars = text.len()))]
    pub async fn render(&self, text: &str) -> Result<Vec<u8>, StageError> {
        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url,
            urlencoding::encode(&self.voice_id),
            OUTPUT_FORMAT
        );
        let resp = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: MODEL_ID,
                voice_settings: &self.settings,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StageError::Rejected {
                service: "elevenlabs",
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// `{output_dir}/voiceovers_audio/voiceover_{YYYYmmdd_HHMMSS}.mp3`
pub fn audio_path(output_dir: &Path) -> PathBuf {
    output_dir.join("voiceovers_audio").join(format!(
        "voiceover_{}.mp3",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[instrument(level = "info", skip_all)]
pub async fn generate_voiceover_audio(
    mut state: PipelineState,
    tts: Option<&ElevenLabs>,
    output_dir: &Path,
) -> Result<PipelineState, StageError> {
    let Some(script) = state.script_text.as_deref() else {
        return Err(StageError::Precondition(
            "script text is not generated yet".into(),
        ));
    };

    let Some(tts) = tts else {
        warn!("ElevenLabs is not configured; skipping voiceover audio");
        return Ok(state);
    };

    let audio = tts.render(script).await?;
    let path = audio_path(output_dir);
    write_bytes(&path, &audio).await?;
    info!(path = %path.display(), bytes = audio.len(), "Voiceover saved");

    state.voiceover_path = Some(path);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scripted_state() -> PipelineState {
        let mut state = PipelineState::new("tech", vec![]);
        state.script_text = Some("Coffee ready? Here are today's stories.".into());
        state
    }

    #[tokio::test]
    async fn test_missing_script_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let state = PipelineState::new("tech", vec![]);
        let err = generate_voiceover_audio(state, None, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_tts_skips() {
        let dir = tempfile::tempdir().unwrap();
        let state = generate_voiceover_audio(scripted_state(), None, dir.path())
            .await
            .unwrap();
        assert!(state.voiceover_path.is_none());
    }

    #[tokio::test]
    async fn test_audio_rendered_and_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .and(query_param("output_format", "mp3_44100_128"))
            .and(header("xi-api-key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let tts = ElevenLabs::new("key", "voice-1").unwrap().with_base_url(server.uri());

        let state = generate_voiceover_audio(scripted_state(), Some(&tts), dir.path())
            .await
            .unwrap();

        let path = state.voiceover_path.unwrap();
        assert!(path.starts_with(dir.path().join("voiceovers_audio")));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3audio");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["use_speaker_boost"], true);
    }
}
