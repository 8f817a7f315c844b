//! Persisted UI preferences.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const UI_STATE_FILE: &str = "ui_state.json";

/// Preferences that survive restarts.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct UiState {
    pub dark_mode: bool,
}

impl UiState {
    /// Reads persisted state from the default file.
    pub async fn read_or_default() -> Self {
        Self::read_or_default_from(Path::new(UI_STATE_FILE)).await
    }

    /// Reads persisted state, falling back to defaults if the file is
    /// missing or unreadable.
    pub async fn read_or_default_from(path: &Path) -> Self {
        match try_read(path).await {
            Ok(state) => state,
            Err(e) => {
                info!(
                    "Error {:?} while reading UI state from {:?}, using defaults",
                    e, path
                );
                UiState::default()
            }
        }
    }

    /// Writes the state as pretty JSON via a temp file and rename, so a
    /// crash mid-write cannot truncate the previous state.
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");

        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        Ok(())
    }

    /// Fire-and-forget persist to the default file.
    pub fn persist(&self) {
        let state = *self;

        tokio::spawn(async move {
            if let Err(e) = state.write_to(Path::new(UI_STATE_FILE)).await {
                error!("Error {:?} while persisting UI state", e);
            }
        });
    }
}

async fn try_read(path: &Path) -> Result<UiState> {
    let contents = tokio::fs::read_to_string(path).await?;

    Ok(serde_json::from_str(&contents)?)
}
