//! Speech synthesis clients.
//!
//! Synthesis goes through an ordered list of backends: a proxied endpoint
//! first when configured, then the direct upstream API. A backend that
//! cannot be reached at all lets the next one take over. An upstream that
//! answered with an error ends the attempt, since the next backend would
//! only repeat the same verdict.

use crate::config::SynthesisConfig;
use crate::constants::MAX_TEXT_LEN;
use crate::decoder::RawAudioPayload;
use crate::error::SynthError;
use crate::voice::VoiceName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize)]
pub struct SynthRequest {
    pub text: String,
    pub voice: String,
}

#[derive(Debug, Deserialize)]
pub struct SynthResponse {
    #[serde(rename = "base64Audio")]
    pub base64_audio: String,
}

#[derive(Debug, Deserialize)]
struct SynthErrorBody {
    error: String,
}

/// One way of reaching the synthesis service.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str, voice: VoiceName)
        -> Result<RawAudioPayload, SynthError>;
}

/// Backend speaking the JSON synthesis contract over HTTP: POST
/// `{ text, voice }`, expect `{ base64Audio }` back.
pub struct HttpSpeechBackend {
    name: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpSpeechBackend {
    pub fn new(name: impl Into<String>, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceName,
    ) -> Result<RawAudioPayload, SynthError> {
        let request = SynthRequest {
            text: text.to_string(),
            voice: voice.to_string(),
        };

        let mut builder = self.client.post(&self.url).json(&request);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SynthError::Unavailable(format!("{} is unreachable: {e}", self.name)))?;

        let status = response.status();

        // A missing endpoint is an availability problem, not an upstream
        // verdict. The next backend may still work.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SynthError::Unavailable(format!(
                "{} has no synthesis endpoint",
                self.name
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SynthErrorBody>(&body)
                .map(|parsed| parsed.error)
                .unwrap_or_else(|_| {
                    if body.is_empty() {
                        format!("synthesis request failed with status {status}")
                    } else {
                        body
                    }
                });

            return Err(SynthError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: SynthResponse = response.json().await.map_err(|e| SynthError::Upstream {
            status: status.as_u16(),
            message: format!("malformed synthesis response: {e}"),
        })?;

        if body.base64_audio.is_empty() {
            return Err(SynthError::Upstream {
                status: status.as_u16(),
                message: "synthesis succeeded but returned no audio".to_string(),
            });
        }

        Ok(RawAudioPayload::new(body.base64_audio))
    }
}

/// Ordered synthesis backends with failover on unavailability.
pub struct SpeechClient {
    backends: Vec<Box<dyn SpeechBackend>>,
}

impl SpeechClient {
    /// Builds the backend list from configuration: proxy first, direct
    /// upstream after it, unless `prefer_direct` flips the order.
    pub fn from_config(config: &SynthesisConfig) -> Self {
        let mut backends: Vec<Box<dyn SpeechBackend>> = Vec::new();

        if let Some(url) = &config.proxy_url {
            backends.push(Box::new(HttpSpeechBackend::new("speech proxy", url, None)));
        }

        if let Some(url) = &config.direct_url {
            backends.push(Box::new(HttpSpeechBackend::new(
                "direct synthesis API",
                url,
                config.api_key.clone(),
            )));
        }

        if config.prefer_direct {
            backends.reverse();
        }

        Self { backends }
    }

    /// A client over explicit backends.
    pub fn with_backends(backends: Vec<Box<dyn SpeechBackend>>) -> Self {
        Self { backends }
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Synthesizes `text` with the first backend that can take the
    /// request. Text length is validated here, before any network call.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: VoiceName,
    ) -> Result<RawAudioPayload, SynthError> {
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(SynthError::Upstream {
                status: 400,
                message: format!("text is limited to {MAX_TEXT_LEN} characters"),
            });
        }

        let mut last_unavailable = None;

        for backend in &self.backends {
            match backend.synthesize(text, voice).await {
                Ok(payload) => return Ok(payload),
                Err(SynthError::Unavailable(reason)) => {
                    warn!("{reason}, trying the next backend");
                    last_unavailable = Some(SynthError::Unavailable(reason));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_unavailable.unwrap_or_else(|| {
            SynthError::Unavailable("no synthesis backends configured".to_string())
        }))
    }
}
