//! Generated content payloads.

use serde::{Deserialize, Serialize};

/// Caption/description pair for a single platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPost {
    pub caption: String,
    pub description: String,
}

/// YouTube gets a title and plain tags instead of a caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubePost {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// The full result payload stored on a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Source transcription (empty for image inputs)
    #[serde(default)]
    pub transcription: String,
    pub caption: String,
    pub description: String,
    /// Space-separated hashtags, e.g. "#travel #food"
    pub hashtags: String,
    pub instagram: PlatformPost,
    pub facebook: PlatformPost,
    pub youtube: YoutubePost,
}

impl GeneratedContent {
    /// Assemble the per-platform variants from the base sections.
    ///
    /// Instagram gets hashtags appended to the caption, Facebook to the
    /// description, and YouTube uses the caption as its title with the
    /// hashtags converted to bare tags.
    pub fn assemble(
        transcription: impl Into<String>,
        caption: impl Into<String>,
        description: impl Into<String>,
        hashtags: impl Into<String>,
    ) -> Self {
        let caption = caption.into();
        let description = description.into();
        let hashtags = hashtags.into();

        let tags: Vec<String> = hashtags
            .split_whitespace()
            .filter(|t| t.starts_with('#'))
            .map(|t| t.trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            transcription: transcription.into(),
            instagram: PlatformPost {
                caption: format!("{}\n\n{}", caption, hashtags),
                description: description.clone(),
            },
            facebook: PlatformPost {
                caption: caption.clone(),
                description: format!("{}\n\n{}", description, hashtags),
            },
            youtube: YoutubePost {
                title: caption.clone(),
                description: format!("{}\n\n{}", description, hashtags),
                tags,
            },
            caption,
            description,
            hashtags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_platform_variants() {
        let content = GeneratedContent::assemble(
            "[0:00 - 0:05] -> hello",
            "Watch this!",
            "A great video.",
            "#travel #food",
        );

        assert_eq!(content.instagram.caption, "Watch this!\n\n#travel #food");
        assert_eq!(content.instagram.description, "A great video.");
        assert_eq!(content.facebook.caption, "Watch this!");
        assert_eq!(content.facebook.description, "A great video.\n\n#travel #food");
        assert_eq!(content.youtube.title, "Watch this!");
        assert_eq!(content.youtube.tags, vec!["travel", "food"]);
    }

    #[test]
    fn test_assemble_ignores_non_hashtag_tokens() {
        let content = GeneratedContent::assemble("", "c", "d", "#one two #three");
        assert_eq!(content.youtube.tags, vec!["one", "three"]);
    }

    #[test]
    fn test_payload_roundtrips_through_json() {
        let content = GeneratedContent::assemble("t", "c", "d", "#x");
        let value = serde_json::to_value(&content).unwrap();
        let back: GeneratedContent = serde_json::from_value(value).unwrap();
        assert_eq!(back, content);
    }
}
