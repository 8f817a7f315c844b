//! Writing finished audio to disk.

use crate::decoder::RawAudioPayload;
use crate::voice::VoiceName;
use crate::wav;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    /// Characters in an RFC 3339 timestamp that are awkward in filenames.
    static ref TIMESTAMP_SANITIZER: Regex = Regex::new(r"[:.]").unwrap();
}

/// Base name (without extension) for an exported artifact:
/// `funny-voice-{voice}-{timestamp}`, with `:` and `.` in the timestamp
/// replaced by `-`.
pub fn artifact_basename(voice: VoiceName, now: DateTime<Utc>) -> String {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let timestamp = TIMESTAMP_SANITIZER.replace_all(&timestamp, "-");

    format!("funny-voice-{voice}-{timestamp}")
}

/// Writes the payload as a WAV file into `dir` and returns the path.
pub async fn export_wav(
    dir: &Path,
    voice: VoiceName,
    payload: &RawAudioPayload,
) -> Result<PathBuf> {
    let container = wav::create_wav(payload)?;
    let path = dir.join(format!("{}.wav", artifact_basename(voice, Utc::now())));

    tokio::fs::write(&path, container.as_bytes())
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;

    Ok(path)
}

/// Writes the raw payload and its voice as pretty JSON into `dir` and
/// returns the path.
pub async fn export_json(
    dir: &Path,
    voice: VoiceName,
    payload: &RawAudioPayload,
) -> Result<PathBuf> {
    let document = serde_json::json!({
        "voice": voice,
        "audio": payload.as_str(),
    });

    let json = serde_json::to_string_pretty(&document)?;
    let path = dir.join(format!("{}.json", artifact_basename(voice, Utc::now())));

    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;

    Ok(path)
}
