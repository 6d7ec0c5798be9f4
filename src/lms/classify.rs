use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Video,
    Article,
    Quiz,
    Mixed,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Quiz => "quiz",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "article" => Ok(Self::Article),
            "quiz" => Ok(Self::Quiz),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!("unknown content type `{other}`")),
        }
    }
}

/// Raw authored content of a lesson, as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LessonContent<'a> {
    /// JSON array of URLs
    pub video_urls: &'a str,
    /// HTML
    pub article: &'a str,
    /// JSON array of questions
    pub quiz_data: &'a str,
    pub has_resources: bool,
}

type Rule = (fn(&LessonContent<'_>) -> bool, ContentType);

// Evaluated top to bottom, first match wins.
const RULES: [Rule; 4] = [
    (has_videos, ContentType::Video),
    (has_article_text, ContentType::Article),
    (has_quiz_questions, ContentType::Quiz),
    (has_resources, ContentType::Mixed),
];

/// Picks the single primary content type of a lesson.
///
/// Malformed JSON never fails: a field that does not parse but still holds
/// text is treated as having content.
pub fn classify(content: &LessonContent<'_>, fallback: ContentType) -> ContentType {
    RULES
        .iter()
        .find(|(matches, _)| matches(content))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(fallback)
}

fn has_videos(content: &LessonContent<'_>) -> bool {
    let raw = content.video_urls.trim();
    if raw.is_empty() {
        return false;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items.iter().any(is_non_blank_string),
        Ok(value @ Value::String(_)) => is_non_blank_string(&value),
        Ok(_) => false,
        Err(_) => true,
    }
}

fn has_article_text(content: &LessonContent<'_>) -> bool {
    !strip_tags(content.article).trim().is_empty()
}

fn has_quiz_questions(content: &LessonContent<'_>) -> bool {
    let raw = content.quiz_data.trim();
    if raw.is_empty() {
        return false;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => !items.is_empty(),
        Ok(_) => false,
        Err(_) => true,
    }
}

fn has_resources(content: &LessonContent<'_>) -> bool {
    content.has_resources
}

fn is_non_blank_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

pub fn strip_tags(html: &str) -> std::borrow::Cow<'_, str> {
    TAG_RE.replace_all(html, "")
}

#[cfg(test)]
mod test {
    use super::*;

    fn content<'a>(
        video_urls: &'a str,
        article: &'a str,
        quiz_data: &'a str,
        has_resources: bool,
    ) -> LessonContent<'a> {
        LessonContent {
            video_urls,
            article,
            quiz_data,
            has_resources,
        }
    }

    fn classify_str(v: &str, a: &str, q: &str, r: bool) -> &'static str {
        classify(&content(v, a, q, r), ContentType::Video).as_str()
    }

    #[test]
    fn test_video() {
        assert_eq!(classify_str(r#"["https://a"]"#, "", "[]", false), "video");
    }

    #[test]
    fn test_article() {
        assert_eq!(classify_str("[]", "<p>Hello</p>", "[]", false), "article");
    }

    #[test]
    fn test_quiz() {
        assert_eq!(classify_str("[]", "<p></p>", r#"[{"q":"1+1"}]"#, false), "quiz");
    }

    #[test]
    fn test_mixed() {
        assert_eq!(classify_str("[]", "", "[]", true), "mixed");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(classify_str("[]", "", "[]", false), "video");
        let empty = content("", "", "", false);
        assert_eq!(classify(&empty, ContentType::Quiz), ContentType::Quiz);
        assert_eq!(classify(&empty, ContentType::Article), ContentType::Article);
    }

    #[test]
    fn test_video_wins_over_everything() {
        assert_eq!(
            classify_str(r#"["https://a"]"#, "<p>Hello</p>", r#"[{"q":"x"}]"#, true),
            "video"
        );
    }

    #[test]
    fn test_article_wins_over_quiz_and_resources() {
        assert_eq!(
            classify_str("", "<h1>Intro</h1>", r#"[{"q":"x"}]"#, true),
            "article"
        );
    }

    #[test]
    fn test_blank_video_entries_do_not_count() {
        assert_eq!(classify_str(r#"["", "   "]"#, "", "", false), "video");
        let c = content(r#"["", "   "]"#, "", "", true);
        assert_eq!(classify(&c, ContentType::Quiz), ContentType::Mixed);
    }

    #[test]
    fn test_non_string_video_entries_do_not_count() {
        let c = content(r#"[1, null, {}]"#, "", "", false);
        assert_eq!(classify(&c, ContentType::Article), ContentType::Article);
    }

    #[test]
    fn test_malformed_video_json_counts_as_video() {
        let c = content("https://youtube.com/watch?v=1", "", "", false);
        assert_eq!(classify(&c, ContentType::Mixed), ContentType::Video);
    }

    #[test]
    fn test_json_string_video_counts() {
        let c = content(r#""https://vimeo.com/1""#, "", "", false);
        assert_eq!(classify(&c, ContentType::Mixed), ContentType::Video);
    }

    #[test]
    fn test_whitespace_only_fields_are_empty() {
        let c = content("   ", " \n\t", "  ", false);
        assert_eq!(classify(&c, ContentType::Mixed), ContentType::Mixed);
        assert_eq!(classify(&c, ContentType::Article), ContentType::Article);
    }

    #[test]
    fn test_tag_only_article_is_empty() {
        let c = content("", "<p> </p><br/><div>\n</div>", "", false);
        assert_eq!(classify(&c, ContentType::Quiz), ContentType::Quiz);
    }

    #[test]
    fn test_malformed_quiz_json_counts_as_quiz() {
        let c = content("", "", "{question: 1", false);
        assert_eq!(classify(&c, ContentType::Video), ContentType::Quiz);
    }

    #[test]
    fn test_quiz_object_is_not_a_question_list() {
        let c = content("", "", r#"{"q": "x"}"#, false);
        assert_eq!(classify(&c, ContentType::Article), ContentType::Article);
    }

    #[test]
    fn test_idempotent() {
        let c = content("[]", "<p>text</p>", "[]", true);
        let first = classify(&c, ContentType::Video);
        assert_eq!(first, classify(&c, ContentType::Video));
    }

    #[test]
    fn test_content_type_round_trip() {
        for ty in [
            ContentType::Video,
            ContentType::Article,
            ContentType::Quiz,
            ContentType::Mixed,
        ] {
            assert_eq!(ty.as_str().parse::<ContentType>().unwrap(), ty);
            assert_eq!(
                serde_json::to_string(&ty).unwrap(),
                format!("\"{}\"", ty.as_str())
            );
        }
        assert!("video-default".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_tags("no tags"), "no tags");
    }
}
