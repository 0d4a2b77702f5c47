//! Bitrate tiers for the fixed transcode profile.

use serde::{Deserialize, Serialize};

/// Output quality preset. Bitrate is the only knob the transcode profile
/// exposes; everything else (codec, sample rate, channel layout) is left to
/// the engine's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionLevel {
    /// 192 kbit/s
    High,
    /// 128 kbit/s
    #[default]
    Balanced,
    /// 64 kbit/s
    Low,
    /// 32 kbit/s
    VeryLow,
}

impl CompressionLevel {
    /// The `-b:a` value for this tier.
    pub fn bitrate(&self) -> &'static str {
        match self {
            Self::High => "192k",
            Self::Balanced => "128k",
            Self::Low => "64k",
            Self::VeryLow => "32k",
        }
    }

    /// Wire name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Balanced => "balanced",
            Self::Low => "low",
            Self::VeryLow => "very-low",
        }
    }

    /// Parses a tier name. Unrecognized values fall back to `Balanced`.
    pub fn parse(value: &str) -> Self {
        match value {
            "high" => Self::High,
            "balanced" => Self::Balanced,
            "low" => Self::Low,
            "very-low" => Self::VeryLow,
            _ => Self::Balanced,
        }
    }
}
