//! Content modalities accepted by the ingestion surface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of content an upload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Image,
    Video,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Video => "video",
            Modality::Audio => "audio",
        }
    }

    /// File extensions accepted for this modality.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Modality::Image => &["png", "jpg", "jpeg", "gif", "bmp"],
            Modality::Video => &["mp4", "avi", "mov", "wmv"],
            Modality::Audio => &["mp3", "wav", "flac", "m4a"],
            Modality::Text => &["txt", "pdf", "doc", "docx"],
        }
    }

    /// Whether a filename's extension is acceptable for this modality.
    pub fn accepts_filename(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions().contains(&ext.as_str())
            }
            None => false,
        }
    }

    /// Whether embedding generation for this modality runs asynchronously.
    ///
    /// Video and audio are delegated to the segmented async API; text and
    /// image embed synchronously.
    pub fn is_async(&self) -> bool {
        matches!(self, Modality::Video | Modality::Audio)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_filename() {
        assert!(Modality::Video.accepts_filename("clip.mp4"));
        assert!(Modality::Video.accepts_filename("CLIP.MOV"));
        assert!(!Modality::Video.accepts_filename("clip.exe"));
        assert!(!Modality::Video.accepts_filename("noextension"));
        assert!(Modality::Text.accepts_filename("notes.txt"));
    }

    #[test]
    fn test_async_modalities() {
        assert!(Modality::Video.is_async());
        assert!(Modality::Audio.is_async());
        assert!(!Modality::Text.is_async());
        assert!(!Modality::Image.is_async());
    }
}
