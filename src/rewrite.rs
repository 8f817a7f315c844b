//! Optional text rewrite before synthesis.
//!
//! When a rewrite endpoint is configured, the text is first punched up in
//! the style of the chosen voice. A failed rewrite is never fatal, the
//! text goes to synthesis unchanged.

use crate::config::RewriteConfig;
use crate::error::RewriteError;
use crate::voice::{voice_option, VoiceName};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct RewriteRequest {
    text: String,
    voice: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    text: String,
}

pub struct RewriteClient {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RewriteClient {
    pub fn from_config(config: &RewriteConfig) -> Self {
        Self {
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Rewrites `text` in the style of `voice`, falling back to the
    /// original text when the rewrite service fails.
    pub async fn rewrite(&self, text: &str, voice: VoiceName) -> String {
        match self.try_rewrite(text, voice).await {
            Ok(rewritten) => rewritten,
            Err(e) => {
                debug!("Rewrite failed ({e}), keeping the original text");
                text.to_string()
            }
        }
    }

    async fn try_rewrite(&self, text: &str, voice: VoiceName) -> Result<String, RewriteError> {
        let option = voice_option(voice);

        let request = RewriteRequest {
            text: text.to_string(),
            voice: voice.to_string(),
            description: option.description.to_string(),
        };

        let mut builder = self.client.post(&self.url).json(&request);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RewriteError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RewriteError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        let body: RewriteResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Request(e.to_string()))?;

        if body.text.trim().is_empty() {
            return Err(RewriteError::MissingText);
        }

        Ok(body.text)
    }
}
