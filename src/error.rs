//! Error taxonomy for the synthesis and playback pipeline.
//!
//! Decode and synthesis failures abort the current generation attempt but
//! never corrupt a previously loaded playback session.

use thiserror::Error;

/// Failure turning a base64 PCM payload into a playable buffer.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload was empty, or decoded to zero bytes.
    #[error("Audio payload is empty")]
    EmptyPayload,

    /// Payload was not valid base64.
    #[error("Audio payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decoding requires an engine context and none has been created.
    #[error("Audio engine context is unavailable")]
    ContextUnavailable,
}

/// Failure from the speech synthesis boundary.
#[derive(Error, Debug)]
pub enum SynthError {
    /// Backend missing or unreachable. Recovered by trying the next
    /// backend in the chain; only surfaced when the chain is exhausted.
    #[error("Speech backend unavailable: {0}")]
    Unavailable(String),

    /// The service answered with an error. Surfaced to the user.
    #[error("Speech service error (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

impl SynthError {
    /// Remediation guidance shown to the user next to the error message.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            SynthError::Upstream { status, message }
                if *status == 403 || message.contains("location") || message.contains("Location") =>
            {
                Some(
                    "Access seems to be restricted in your region. \
                     Try a VPN, or configure proxy_url to route through a deployment \
                     that is allowed to reach the service.",
                )
            }
            SynthError::Upstream { status, .. } if *status >= 500 => Some(
                "The speech service had a temporary problem. \
                 Try again in a moment, or pick a different voice.",
            ),
            _ => None,
        }
    }
}

/// Failure from the rewrite-style text transform boundary. Always
/// recovered by keeping the original text; never surfaced to the user.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Rewrite request failed: {0}")]
    Request(String),

    #[error("Rewrite response contained no text")]
    MissingText,
}
