use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::fs::read_to_string;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SynthesisConfig {
    /// Proxied synthesis endpoint, tried first. Needs no api key.
    pub proxy_url: Option<String>,

    /// Direct synthesis endpoint, used when the proxy is missing.
    pub direct_url: Option<String>,

    /// Api key sent to the direct endpoint.
    pub api_key: Option<String>,

    /// Skip the proxy and call the direct endpoint first.
    #[serde(default)]
    pub prefer_direct: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RewriteConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NetConfig {
    /// Address the live audio stream listens on.
    pub listen_addr: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Optional rewrite-style text transform service.
    pub rewrite: Option<RewriteConfig>,

    #[serde(default)]
    pub net: NetConfig,
}

pub async fn load() -> Result<Config> {
    let config = read_to_string("Config.toml").await?;
    let config: Config = toml::from_str(&config)?;

    Ok(config)
}

/// Reads Config.toml, falling back to defaults when the file is missing
/// or unreadable.
pub async fn load_or_default() -> Config {
    match load().await {
        Ok(config) => config,
        Err(e) => {
            info!("Error {:?} while reading Config.toml, using defaults", e);
            Config::default()
        }
    }
}
