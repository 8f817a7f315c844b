//! The fixed set of voice personas offered by the synthesis service.

use anyhow::anyhow;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum VoiceName {
    #[default]
    Puck,
    Fenrir,
    Zephyr,
    Charon,
    Kore,
}

impl fmt::Display for VoiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoiceName::Puck => "Puck",
            VoiceName::Fenrir => "Fenrir",
            VoiceName::Zephyr => "Zephyr",
            VoiceName::Charon => "Charon",
            VoiceName::Kore => "Kore",
        };

        write!(f, "{name}")
    }
}

impl FromStr for VoiceName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "puck" => Ok(VoiceName::Puck),
            "fenrir" => Ok(VoiceName::Fenrir),
            "zephyr" => Ok(VoiceName::Zephyr),
            "charon" => Ok(VoiceName::Charon),
            "kore" => Ok(VoiceName::Kore),
            _ => Err(anyhow!("Unknown voice: {s}")),
        }
    }
}

/// Catalog entry describing a voice persona to the user.
pub struct VoiceOption {
    pub id: VoiceName,
    pub role: &'static str,
    pub description: &'static str,
    pub gender: &'static str,
}

lazy_static! {
    /// Voice catalog in presentation order, listed by the `voices` command.
    pub static ref VOICE_OPTIONS: Vec<VoiceOption> = vec![
        VoiceOption {
            id: VoiceName::Puck,
            role: "Playful",
            description: "Energetic, slightly high timbre. Works well for emotional texts.",
            gender: "Male",
        },
        VoiceOption {
            id: VoiceName::Fenrir,
            role: "Deep",
            description: "The lowest, most powerful bass. Sounds serious and authoritative.",
            gender: "Male",
        },
        VoiceOption {
            id: VoiceName::Zephyr,
            role: "Calm",
            description: "Balanced male voice. Ideal for reading news and stories.",
            gender: "Male",
        },
        VoiceOption {
            id: VoiceName::Charon,
            role: "Confident",
            description: "Rich timbre, suited for podcasts and professional narration.",
            gender: "Male",
        },
        VoiceOption {
            id: VoiceName::Kore,
            role: "Female",
            description: "Soft, natural female voice. Sounds warm and relaxing.",
            gender: "Female",
        },
    ];
}

pub fn voice_option(voice: VoiceName) -> &'static VoiceOption {
    VOICE_OPTIONS
        .iter()
        .find(|option| option.id == voice)
        .expect("Expected every voice to have a catalog entry")
}
