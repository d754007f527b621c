//! Media-domain enums for input classification and output containers.
//!
//! All enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// MediaType
// ---------------------------------------------------------------------------

/// Coarse classification of an artifact flowing through a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Other,
}

impl MediaType {
    /// Classify a MIME type string (e.g. `video/mp4`).
    ///
    /// Anything that is not an image, video or audio type maps to
    /// [`MediaType::Other`].
    pub fn from_mime(mime: &str) -> Self {
        let top = mime
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match top.as_str() {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "image" => Self::Image,
            _ => Self::Other,
        }
    }

    /// Guess the media type from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "mkv" | "webm" | "mov" | "avi" | "m4v" | "gif" => Self::Video,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "opus" | "m4a" => Self::Audio,
            "png" | "jpg" | "jpeg" | "bmp" | "webp" | "tiff" => Self::Image,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Image => write!(f, "image"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "image" => Ok(Self::Image),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Output container formats a pipeline can convert into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mkv,
    Webm,
    Mov,
    Gif,
}

impl Container {
    /// The ffmpeg muxer name passed to `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "matroska",
            Self::Webm => "webm",
            Self::Mov => "mov",
            Self::Gif => "gif",
        }
    }

    /// File extension (without the dot) for outputs in this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Mov => "mov",
            Self::Gif => "gif",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" | "matroska" => Ok(Self::Mkv),
            "webm" => Ok(Self::Webm),
            "mov" => Ok(Self::Mov),
            "gif" => Ok(Self::Gif),
            other => Err(format!("unsupported container: {other}")),
        }
    }
}
