// ClassificationReport - parsed classifier response
//
// The classifier is asked for `{"emotion", "color", "description"}` but
// replies are free text. Parsing takes the outermost `{ ... }` span, keeps
// whatever fields are usable, and fills the rest from fallbacks.

use serde::{Deserialize, Serialize};

/// Emotion used when the response carries none
pub const UNKNOWN_EMOTION: &str = "unknown";

/// Fallback colors per emotion, `#RRGGBB`
const EMOTION_COLORS: &[(&str, &str)] = &[
    ("joy", "#FFD700"),
    ("happy", "#FFD700"),
    ("excited", "#FF8C00"),
    ("surprise", "#FF69B4"),
    ("calm", "#2E8B57"),
    ("love", "#FF1493"),
    ("sadness", "#4169E1"),
    ("sad", "#4169E1"),
    ("fear", "#800080"),
    ("anger", "#DC143C"),
    ("angry", "#DC143C"),
    ("disgust", "#6B8E23"),
    ("neutral", "#A9A9A9"),
];

const DEFAULT_COLOR: &str = "#808080";

/// What the presentation sink receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub emotion: String,
    /// `#RRGGBB`
    pub color: String,
    pub description: String,
}

#[derive(Deserialize)]
struct RawReport {
    emotion: Option<String>,
    color: Option<String>,
    description: Option<String>,
}

impl ClassificationReport {
    /// Parse a raw response; never fails
    pub fn parse(raw: &str) -> Self {
        let parsed = json_span(raw).and_then(|span| serde_json::from_str::<RawReport>(span).ok());

        let Some(parsed) = parsed else {
            log::debug!("[ClassificationReport] No JSON object in response, using raw text");
            return Self::fallback(raw);
        };

        let emotion = parsed
            .emotion
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| UNKNOWN_EMOTION.to_string());

        let color = parsed
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| is_hex_color(c))
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| color_for_emotion(&emotion).to_string());

        let description = parsed
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| raw.trim().to_string());

        Self {
            emotion,
            color,
            description,
        }
    }

    fn fallback(raw: &str) -> Self {
        Self {
            emotion: UNKNOWN_EMOTION.to_string(),
            color: color_for_emotion(UNKNOWN_EMOTION).to_string(),
            description: raw.trim().to_string(),
        }
    }
}

/// Table color for an emotion, gray when unlisted
pub fn color_for_emotion(emotion: &str) -> &'static str {
    let emotion = emotion.trim().to_lowercase();
    EMOTION_COLORS
        .iter()
        .find(|(name, _)| *name == emotion)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}

fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_json() {
        let report = ClassificationReport::parse(
            r##"{"emotion": "Joy", "color": "#ffaa00", "description": "Upbeat and bright."}"##,
        );
        assert_eq!(report.emotion, "joy");
        assert_eq!(report.color, "#FFAA00");
        assert_eq!(report.description, "Upbeat and bright.");
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let raw = "Sure! Here is the result:\n```json\n{\"emotion\": \"calm\", \"description\": \"Quiet.\"}\n```";
        let report = ClassificationReport::parse(raw);
        assert_eq!(report.emotion, "calm");
        // Missing color comes from the table
        assert_eq!(report.color, "#2E8B57");
        assert_eq!(report.description, "Quiet.");
    }

    #[test]
    fn test_malformed_color_replaced() {
        let report = ClassificationReport::parse(
            r#"{"emotion": "anger", "color": "red", "description": "Loud."}"#,
        );
        assert_eq!(report.color, "#DC143C");
    }

    #[test]
    fn test_plain_text_falls_back() {
        let report = ClassificationReport::parse("  I think it sounds sad.  ");
        assert_eq!(report.emotion, UNKNOWN_EMOTION);
        assert_eq!(report.color, DEFAULT_COLOR);
        assert_eq!(report.description, "I think it sounds sad.");
    }

    #[test]
    fn test_missing_emotion_is_unknown() {
        let report = ClassificationReport::parse(r#"{"description": "Hard to say."}"#);
        assert_eq!(report.emotion, UNKNOWN_EMOTION);
        assert_eq!(report.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_color_table_lookup() {
        assert_eq!(color_for_emotion("Sadness"), "#4169E1");
        assert_eq!(color_for_emotion("bewildered"), DEFAULT_COLOR);
    }
}
