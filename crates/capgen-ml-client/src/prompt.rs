//! Prompt construction and response parsing for content generation.

use capgen_models::{GeneratedContent, GenerationParams, LengthPreset};

/// System role for every generation request.
pub const SYSTEM_PROMPT: &str = "You are a social media expert who creates engaging captions, \
     descriptions, and trending hashtags for video content. Make content suitable for \
     Instagram, Facebook, and YouTube.";

fn caption_requirement(length: LengthPreset) -> &'static str {
    match length {
        LengthPreset::Short => "1 sentence (concise and punchy)",
        LengthPreset::Medium => "2 sentences (engaging with hook)",
        LengthPreset::Long => "3 sentences (detailed with strong hook)",
    }
}

fn description_requirement(length: LengthPreset) -> &'static str {
    match length {
        LengthPreset::Short => "1 paragraph (brief overview)",
        LengthPreset::Medium => "2-3 paragraphs (detailed explanation)",
        LengthPreset::Long => "4-5 paragraphs (comprehensive and detailed)",
    }
}

fn format_instructions(params: &GenerationParams) -> String {
    format!(
        "Please provide:\n\
         1. A hook-style caption ({caption}, written like a hook that grabs attention and \
         creates curiosity. Use attention-grabbing phrases, emojis, and make people want \
         to watch)\n\
         2. A detailed description ({description} explaining the content)\n\
         3. Exactly {hashtags} trending hashtags relevant to the content\n\n\
         Format the response as:\n\n\
         CAPTION:\n\
         [Your hook-style attention-grabbing caption here with emojis]\n\n\
         DESCRIPTION:\n\
         [Your detailed description here]\n\n\
         HASHTAGS:\n\
         [Your hashtags separated by spaces, like: #trending #video #content]",
        caption = caption_requirement(params.caption_length),
        description = description_requirement(params.description_length),
        hashtags = params.hashtag_count,
    )
}

/// Prompt for transcript-based generation (audio and video inputs).
pub fn build_transcript_prompt(transcription: &str, params: &GenerationParams) -> String {
    format!(
        "Based on this video transcription, generate social media content for Instagram, \
         Facebook, and YouTube:\n\nTranscription:\n{transcription}\n\n{instructions}",
        instructions = format_instructions(params),
    )
}

/// Prompt for image-based generation.
pub fn build_image_prompt(params: &GenerationParams) -> String {
    format!(
        "Analyze this image and generate social media content for Instagram, Facebook, \
         and YouTube based on what it shows.\n\n{instructions}",
        instructions = format_instructions(params),
    )
}

/// Extract a section between its marker and the next marker (or the end).
fn extract_section<'a>(content: &'a str, marker: &str, next_markers: &[&str]) -> &'a str {
    let Some(start) = content.find(marker) else {
        return "";
    };
    let rest = &content[start + marker.len()..];

    let end = next_markers
        .iter()
        .filter_map(|m| rest.find(m))
        .min()
        .unwrap_or(rest.len());

    rest[..end].trim()
}

/// Parse a model response into the stored content payload.
///
/// Missing markers yield empty sections rather than an error; the model
/// occasionally drops one and a partial result is still useful.
pub fn parse_generated_content(
    transcription: impl Into<String>,
    content: &str,
) -> GeneratedContent {
    let caption = extract_section(content, "CAPTION:", &["DESCRIPTION:", "HASHTAGS:"]);
    let description = extract_section(content, "DESCRIPTION:", &["HASHTAGS:"]);
    let hashtags = extract_section(content, "HASHTAGS:", &[]);

    GeneratedContent::assemble(transcription, caption, description, hashtags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_requirements() {
        let params = GenerationParams {
            caption_length: LengthPreset::Short,
            description_length: LengthPreset::Long,
            hashtag_count: 10,
        };
        let prompt = build_transcript_prompt("[0:00 - 0:05] -> hi", &params);

        assert!(prompt.contains("[0:00 - 0:05] -> hi"));
        assert!(prompt.contains("1 sentence (concise and punchy)"));
        assert!(prompt.contains("4-5 paragraphs"));
        assert!(prompt.contains("Exactly 10 trending hashtags"));
    }

    #[test]
    fn test_parse_full_response() {
        let response = "CAPTION:\nYou won't believe this! 🔥\n\n\
                        DESCRIPTION:\nA deep dive into the topic.\n\n\
                        HASHTAGS:\n#wow #trending";
        let content = parse_generated_content("t", response);

        assert_eq!(content.caption, "You won't believe this! 🔥");
        assert_eq!(content.description, "A deep dive into the topic.");
        assert_eq!(content.hashtags, "#wow #trending");
        assert_eq!(content.transcription, "t");
    }

    #[test]
    fn test_parse_missing_sections_yield_empty() {
        let content = parse_generated_content("", "no markers at all");
        assert_eq!(content.caption, "");
        assert_eq!(content.description, "");
        assert_eq!(content.hashtags, "");
    }

    #[test]
    fn test_parse_partial_response() {
        let response = "CAPTION:\nonly a caption";
        let content = parse_generated_content("", response);
        assert_eq!(content.caption, "only a caption");
        assert_eq!(content.description, "");
        assert_eq!(content.hashtags, "");
    }
}
