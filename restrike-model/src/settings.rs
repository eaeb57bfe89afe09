use std::fmt;

use serde::{Deserialize, Serialize};

/// Output encoding for regenerated artifacts.
///
/// Deserialization is lenient: format names arrive as free-form strings from
/// stored settings blobs, so unknown or oddly cased values collapse to Jpeg
/// rather than failing the whole blob.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EncodeFormat {
    Jpeg,
    Png,
    Webp,
}

impl EncodeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpeg",
            EncodeFormat::Png => "png",
            EncodeFormat::Webp => "webp",
        }
    }

    /// File extension used when building artifact paths.
    pub fn extension(&self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::Png => "png",
            EncodeFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for EncodeFormat {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => EncodeFormat::Png,
            "webp" => EncodeFormat::Webp,
            _ => EncodeFormat::Jpeg,
        }
    }
}

impl From<&str> for EncodeFormat {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<EncodeFormat> for String {
    fn from(value: EncodeFormat) -> Self {
        value.as_str().to_string()
    }
}

/// Parameters for one regeneration pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: EncodeFormat,
}

impl EncodeSettings {
    pub fn cache_defaults() -> Self {
        Self {
            width: 1920,
            height: 1080,
            quality: 85,
            format: EncodeFormat::Jpeg,
        }
    }

    pub fn thumbnail_defaults() -> Self {
        Self {
            width: 300,
            height: 300,
            quality: 90,
            format: EncodeFormat::Jpeg,
        }
    }
}
