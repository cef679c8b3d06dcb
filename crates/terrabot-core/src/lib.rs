use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod chat;
pub mod config;
pub mod intent;
pub mod retrieval;
pub mod similarity;
pub mod summary;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("document store failed: {0}")]
    Store(String),
    #[error("pdf failed: {0}")]
    Pdf(String),
    #[error("pdf download timed out after {0:?}")]
    PdfTimeout(Duration),
    #[error("dataset failed: {0}")]
    Dataset(String),
    #[error("translation failed: {0}")]
    Translate(String),
    #[error("completion failed: {0}")]
    Completion(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Language tag for Cebuano (Bisaya), as produced by the detectors.
pub const CEBUANO: &str = "ceb";
pub const ENGLISH: &str = "en";

/// The user's message, trimmed, plus the language it was detected in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub language: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn is_cebuano(&self) -> bool {
        self.language.as_deref() == Some(CEBUANO)
    }
}

/// A candidate that cleared the cutoff.
///
/// `text` is always a verbatim member of the pool it was picked from.
/// `source_id` names the structured record that produced it, when there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matched {
    pub text: String,
    pub score: f64,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Match(Matched),
    NoMatch,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Match(_))
    }

    pub fn into_option(self) -> Option<Matched> {
        match self {
            MatchResult::Match(m) => Some(m),
            MatchResult::NoMatch => None,
        }
    }

    pub fn with_source(self, id: &str) -> Self {
        match self {
            MatchResult::Match(m) => MatchResult::Match(Matched {
                source_id: Some(id.to_string()),
                ..m
            }),
            MatchResult::NoMatch => MatchResult::NoMatch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// One stored conversation from the Q/A dataset (one JSON object per line).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// The historical user turn: the second-to-last message.
    pub fn user_turn(&self) -> Option<&str> {
        let n = self.messages.len();
        if n < 2 {
            return None;
        }
        Some(self.messages[n - 2].content.as_str())
    }

    /// The recorded reply paired with `user_turn`.
    pub fn reply(&self) -> Option<&str> {
        if self.messages.len() < 2 {
            return None;
        }
        self.messages.last().map(|m| m.content.as_str())
    }
}

/// A record from the document store: an id plus free-form JSON fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// String field, or `None` when absent, non-string, or blank.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

pub const FIELD_TITLE: &str = "title";
pub const FIELD_BODY: &str = "body";
pub const FIELD_STEPS: &str = "steps";
pub const FIELD_STEP_DESCRIPTION: &str = "description";
pub const FIELD_EXTRACTED_TEXT: &str = "extracted_text";
pub const FIELD_TRANSLATED_TEXT: &str = "translated_text";
pub const FIELD_PDF_URL: &str = "pdf_url";
pub const FIELD_URL: &str = "url";

/// Knowledge-guide view over a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Guide<'a> {
    doc: &'a Document,
}

impl<'a> Guide<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    pub fn id(&self) -> &'a str {
        &self.doc.id
    }

    pub fn title(&self) -> Option<&'a str> {
        self.doc.str_field(FIELD_TITLE)
    }

    pub fn body(&self) -> Option<&'a str> {
        self.doc.str_field(FIELD_BODY)
    }

    pub fn extracted_text(&self) -> Option<&'a str> {
        self.doc.str_field(FIELD_EXTRACTED_TEXT)
    }

    pub fn translated_text(&self) -> Option<&'a str> {
        self.doc.str_field(FIELD_TRANSLATED_TEXT)
    }

    pub fn pdf_url(&self) -> Option<&'a str> {
        self.doc.str_field(FIELD_PDF_URL)
    }

    /// Per-step descriptions; steps that are not objects or lack a string description are skipped.
    pub fn step_descriptions(&self) -> Vec<&'a str> {
        self.doc
            .fields
            .get(FIELD_STEPS)
            .and_then(|v| v.as_array())
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|s| s.get(FIELD_STEP_DESCRIPTION).and_then(|d| d.as_str()))
                    .filter(|s| !s.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Content candidates: body lines, step descriptions, extracted-text lines (in that order).
    pub fn content_lines(&self) -> Vec<&'a str> {
        let mut out = Vec::new();
        if let Some(body) = self.body() {
            out.extend(body.lines().filter(|l| !l.trim().is_empty()));
        }
        out.extend(self.step_descriptions());
        if let Some(text) = self.extracted_text() {
            out.extend(text.lines().filter(|l| !l.trim().is_empty()));
        }
        out
    }

    /// The long-form text a summary is cut from.
    ///
    /// Prefers `extracted_text`, then `body` followed by the step descriptions, then the title.
    pub fn long_text(&self) -> Option<String> {
        if let Some(t) = self.extracted_text() {
            return Some(t.to_string());
        }
        let steps = self.step_descriptions();
        match (self.body(), steps.is_empty()) {
            (Some(b), true) => Some(b.to_string()),
            (Some(b), false) => Some(format!("{b}\n{}", steps.join("\n"))),
            (None, false) => Some(steps.join("\n")),
            (None, true) => self.title().map(|t| t.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;
    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ConversationSource: Send + Sync {
    async fn conversations(&self) -> Result<Vec<Conversation>>;
}

#[async_trait::async_trait]
pub trait PdfFetcher: Send + Sync {
    /// Download a PDF body. A bounded wait that expires surfaces as [`Error::PdfTimeout`].
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>>;
}

pub trait PdfExtractor: Send + Sync {
    /// Best-effort text extraction; empty string when the bytes are not a readable PDF.
    fn extract(&self, bytes: &[u8]) -> String;
}

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;
}

#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> Result<String>;
}

#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Translate, falling back to the input text when the translator fails.
pub async fn translate_or_original(translator: &dyn Translator, text: &str, target: &str) -> String {
    match translator.translate(text, target).await {
        Ok(t) if !t.trim().is_empty() => t,
        Ok(_) => text.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, target, "translation failed; serving original text");
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_turns_use_last_two_messages() {
        let c: Conversation = serde_json::from_value(json!({
            "messages": [
                {"role": "system", "content": "You are TerraBot."},
                {"role": "user", "content": "How do I transfer a land title?"},
                {"role": "assistant", "content": "Visit the Registry of Deeds."}
            ]
        }))
        .unwrap();
        assert_eq!(c.user_turn(), Some("How do I transfer a land title?"));
        assert_eq!(c.reply(), Some("Visit the Registry of Deeds."));

        let short = Conversation {
            messages: vec![Message {
                role: "user".into(),
                content: "hi".into(),
            }],
        };
        assert_eq!(short.user_turn(), None);
        assert_eq!(short.reply(), None);
    }

    #[test]
    fn guide_skips_non_string_fields() {
        let doc = Document::new("g1")
            .with_field(FIELD_TITLE, json!(42))
            .with_field(FIELD_BODY, json!("Line one\n\nLine two"))
            .with_field(
                FIELD_STEPS,
                json!([{"description": "Pay the transfer tax"}, {"description": null}, "bogus"]),
            );
        let g = Guide::new(&doc);
        assert_eq!(g.title(), None);
        assert_eq!(
            g.content_lines(),
            vec!["Line one", "Line two", "Pay the transfer tax"]
        );
        assert_eq!(
            g.long_text().as_deref(),
            Some("Line one\n\nLine two\nPay the transfer tax")
        );
    }

    #[test]
    fn query_trims_and_tracks_language() {
        let q = Query::new("  maayong buntag  ").with_language(Some(CEBUANO.to_string()));
        assert_eq!(q.text, "maayong buntag");
        assert!(q.is_cebuano());
    }
}
