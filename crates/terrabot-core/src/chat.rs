//! The chat pipeline: intent gate, tiered retrieval, completion fallback, localization.

use crate::config::{MatchConfig, OffTopicPolicy};
use crate::intent::{self, Intent};
use crate::retrieval::{
    pdf_text, translate_and_cache, DatasetTier, GuideTier, Orchestrator, PdfTier, RetrievalTier,
};
use crate::summary::summarize;
use crate::{
    translate_or_original, CompletionService, ConversationSource, DocumentStore, Error, Guide,
    LanguageDetector, PdfExtractor, PdfFetcher, Query, Result, Translator, CEBUANO,
    FIELD_EXTRACTED_TEXT,
};
use std::sync::Arc;

/// Served when the completion service cannot be reached.
pub const COMPLETION_APOLOGY: &str =
    "Sorry, I'm experiencing issues connecting to the assistant service.";
pub const EMPTY_MESSAGE: &str = "Error: Message cannot be empty.";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyKind {
    Canned(Intent),
    Retrieved { tier: &'static str, score: f64 },
    Generated,
    /// Completion failed; the fixed apology was served.
    Unavailable,
    Redirected,
    /// Off-topic under the reject policy. Transports answer this with a refusal status.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub kind: ReplyKind,
}

impl ChatReply {
    fn new(text: impl Into<String>, kind: ReplyKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.kind == ReplyKind::Rejected
    }
}

/// Outcome of translating a single knowledge guide ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideTranslation {
    Translated,
    /// A translation was already stored; nothing was written.
    Cached,
    /// The guide has no text to translate.
    Skipped,
    /// The translator failed; nothing was written.
    Unavailable,
}

impl GuideTranslation {
    pub fn as_str(self) -> &'static str {
        match self {
            GuideTranslation::Translated => "translated",
            GuideTranslation::Cached => "cached",
            GuideTranslation::Skipped => "skipped",
            GuideTranslation::Unavailable => "unavailable",
        }
    }
}

/// Everything the pipeline talks to. Built once at startup and shared read-only.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn DocumentStore>,
    pub conversations: Arc<dyn ConversationSource>,
    pub pdf_fetcher: Arc<dyn PdfFetcher>,
    pub pdf_extractor: Arc<dyn PdfExtractor>,
    pub detector: Arc<dyn LanguageDetector>,
    pub translator: Arc<dyn Translator>,
    pub completion: Arc<dyn CompletionService>,
}

pub struct ChatPipeline {
    services: Collaborators,
    orchestrator: Orchestrator,
    config: MatchConfig,
    off_topic: OffTopicPolicy,
}

impl ChatPipeline {
    /// Standard tier order: dataset, knowledge guides, PDFs.
    pub fn new(services: Collaborators, config: MatchConfig, off_topic: OffTopicPolicy) -> Self {
        let tiers: Vec<Arc<dyn RetrievalTier>> = vec![
            Arc::new(DatasetTier::new(
                services.conversations.clone(),
                config.dataset_cutoff,
            )),
            Arc::new(GuideTier::new(
                services.store.clone(),
                services.translator.clone(),
                config.clone(),
            )),
            Arc::new(PdfTier::new(
                services.store.clone(),
                services.pdf_fetcher.clone(),
                services.pdf_extractor.clone(),
                config.clone(),
            )),
        ];
        Self {
            services,
            orchestrator: Orchestrator::new(tiers),
            config,
            off_topic,
        }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.orchestrator.tier_names()
    }

    /// Time-of-day greeting for the Asia/Manila clock.
    pub fn greeting(&self) -> String {
        intent::timed_greeting(intent::manila_hour(), &mut rand::thread_rng())
    }

    /// Answer one user message.
    ///
    /// Only an empty message is an error; every collaborator failure degrades to a reply.
    pub async fn respond(&self, message: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput(EMPTY_MESSAGE.to_string()));
        }

        let intent = intent::classify(message);
        let canned = intent::canned_reply(intent, &mut rand::thread_rng());
        if let Some(text) = canned {
            tracing::debug!(?intent, "canned reply");
            return Ok(ChatReply::new(text, ReplyKind::Canned(intent)));
        }
        if intent == Intent::OffTopic {
            tracing::info!(policy = ?self.off_topic, "off-topic message");
            let reply = match self.off_topic {
                OffTopicPolicy::Reject => {
                    ChatReply::new(intent::OFF_TOPIC_REJECTION, ReplyKind::Rejected)
                }
                OffTopicPolicy::Redirect => ChatReply::new(
                    intent::redirect_reply(&mut rand::thread_rng()),
                    ReplyKind::Redirected,
                ),
            };
            return Ok(reply);
        }

        let language = self.services.detector.detect(message);
        let query = Query::new(message).with_language(language);
        tracing::debug!(language = ?query.language, "land query");

        if let Some(answer) = self.orchestrator.run(&query).await {
            let text = if query.is_cebuano() && !answer.localized {
                self.localize(&answer.text).await
            } else {
                answer.text
            };
            return Ok(ChatReply::new(
                text,
                ReplyKind::Retrieved {
                    tier: answer.tier,
                    score: answer.matched.score,
                },
            ));
        }

        match self.services.completion.complete(message).await {
            Ok(text) => {
                let text = text.trim().to_string();
                let text = if query.is_cebuano() {
                    self.localize(&text).await
                } else {
                    text
                };
                Ok(ChatReply::new(text, ReplyKind::Generated))
            }
            Err(e) => {
                tracing::warn!(error = %e, "completion fallback failed");
                Ok(ChatReply::new(COMPLETION_APOLOGY, ReplyKind::Unavailable))
            }
        }
    }

    async fn localize(&self, text: &str) -> String {
        translate_or_original(self.services.translator.as_ref(), text, CEBUANO).await
    }

    /// Pre-translate one guide's summary into Cebuano and store it on the guide.
    ///
    /// A guide with a `pdf_url` but no `extracted_text` has its PDF fetched and the extracted
    /// text written back first.
    pub async fn translate_guide(&self, id: &str) -> Result<GuideTranslation> {
        let collection = &self.config.guide_collection;
        let docs = self.services.store.list(collection).await?;
        let doc = docs
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(format!("guide {id}")))?;
        let guide = Guide::new(doc);
        if guide.translated_text().is_some() {
            return Ok(GuideTranslation::Cached);
        }

        let mut fresh = None;
        if guide.extracted_text().is_none() {
            if let Some(url) = guide.pdf_url() {
                let text = pdf_text(
                    self.services.pdf_fetcher.as_ref(),
                    self.services.pdf_extractor.as_ref(),
                    url,
                )
                .await;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    if let Err(e) = self
                        .services
                        .store
                        .set_field(
                            collection,
                            id,
                            FIELD_EXTRACTED_TEXT,
                            serde_json::Value::String(text.clone()),
                        )
                        .await
                    {
                        tracing::warn!(error = %e, guide = id, "could not store extracted text");
                    }
                    fresh = Some(text);
                }
            }
        }

        let Some(long) = fresh.or_else(|| guide.long_text()) else {
            return Ok(GuideTranslation::Skipped);
        };
        let summary = summarize(&long, self.config.summary_max_chars);
        if summary.is_empty() {
            return Ok(GuideTranslation::Skipped);
        }
        let outcome = match translate_and_cache(
            self.services.store.as_ref(),
            self.services.translator.as_ref(),
            collection,
            id,
            &summary,
        )
        .await
        {
            Some(_) => GuideTranslation::Translated,
            None => GuideTranslation::Unavailable,
        };
        tracing::info!(guide = id, outcome = outcome.as_str(), "guide translation");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::testkit::*;
    use crate::{Document, FIELD_BODY, FIELD_PDF_URL, FIELD_TITLE, FIELD_TRANSLATED_TEXT, FIELD_URL};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubCompletion {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl CompletionService for StubCompletion {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Completion("connection refused".into()));
            }
            Ok(format!("  generated answer for: {prompt}\n"))
        }
    }

    struct FixedDetector(Option<&'static str>);

    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    struct Harness {
        store: Arc<StubStore>,
        conversations: Arc<StubConversations>,
        pdf: Arc<StubPdf>,
        translator: Arc<StubTranslator>,
        completion: Arc<StubCompletion>,
        language: Option<&'static str>,
        policy: OffTopicPolicy,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(StubStore::default()),
                conversations: Arc::new(StubConversations::pairs(&[(
                    "What is a tax declaration?",
                    "A tax declaration records the assessed value of real property.",
                )])),
                pdf: Arc::new(StubPdf::default()),
                translator: Arc::new(StubTranslator::default()),
                completion: Arc::new(StubCompletion::default()),
                language: None,
                policy: OffTopicPolicy::Reject,
            }
        }

        fn pipeline(&self) -> ChatPipeline {
            ChatPipeline::new(
                Collaborators {
                    store: self.store.clone(),
                    conversations: self.conversations.clone(),
                    pdf_fetcher: self.pdf.clone(),
                    pdf_extractor: self.pdf.clone(),
                    detector: Arc::new(FixedDetector(self.language)),
                    translator: self.translator.clone(),
                    completion: self.completion.clone(),
                },
                MatchConfig::default(),
                self.policy,
            )
        }

        fn completions(&self) -> usize {
            self.completion.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let h = Harness::new();
        let err = h.pipeline().respond("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(m) if m == EMPTY_MESSAGE));
    }

    #[tokio::test]
    async fn greeting_never_reaches_retrieval() {
        let h = Harness::new();
        let reply = h.pipeline().respond("Hello").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Canned(Intent::Greeting));
        assert!(intent::GREETING_REPLIES.contains(&reply.text.as_str()));
        assert_eq!(h.conversations.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.lists(), 0);
        assert_eq!(h.completions(), 0);
    }

    #[tokio::test]
    async fn off_topic_follows_the_policy() {
        let mut h = Harness::new();
        let reply = h.pipeline().respond("what is the weather today").await.unwrap();
        assert!(reply.is_rejected());
        assert_eq!(reply.text, intent::OFF_TOPIC_REJECTION);

        h.policy = OffTopicPolicy::Redirect;
        let reply = h.pipeline().respond("what is the weather today").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Redirected);
        assert!(intent::OFF_TOPIC_REDIRECTS.contains(&reply.text.as_str()));
        assert_eq!(h.completions(), 0);
    }

    #[tokio::test]
    async fn dataset_hit_skips_later_tiers() {
        let h = Harness::new();
        let reply = h.pipeline().respond("what is a tax declaration").await.unwrap();
        assert_eq!(
            reply.text,
            "A tax declaration records the assessed value of real property."
        );
        assert!(matches!(reply.kind, ReplyKind::Retrieved { tier: "dataset", .. }));
        assert_eq!(h.store.lists(), 0);
        assert_eq!(h.completions(), 0);
        assert_eq!(h.translator.calls(), 0);
    }

    #[tokio::test]
    async fn cebuano_retrieval_answer_is_translated() {
        let mut h = Harness::new();
        h.language = Some(CEBUANO);
        let reply = h.pipeline().respond("what is a tax declaration").await.unwrap();
        assert_eq!(
            reply.text,
            "[ceb] A tax declaration records the assessed value of real property."
        );
        assert_eq!(h.translator.calls(), 1);
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_completion() {
        let h = Harness::new();
        let cfg = MatchConfig::default();
        h.store.insert(
            &cfg.pdf_collection,
            vec![Document::new("p1").with_field(FIELD_URL, json!("http://pdf/missing"))],
        );
        let reply = h
            .pipeline()
            .respond("explain ancestral domain claims in Mindanao")
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Generated);
        assert_eq!(
            reply.text,
            "generated answer for: explain ancestral domain claims in Mindanao"
        );
        assert_eq!(h.completions(), 1);
        // guide list + pdf list
        assert_eq!(h.store.lists(), 2);
        assert_eq!(h.pdf.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completion_failure_serves_the_apology() {
        let mut h = Harness::new();
        h.completion = Arc::new(StubCompletion {
            fail: true,
            ..Default::default()
        });
        let reply = h.pipeline().respond("zoning rules for farmland").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Unavailable);
        assert_eq!(reply.text, COMPLETION_APOLOGY);
    }

    #[tokio::test]
    async fn translate_guide_writes_once_then_reports_cached() {
        let h = Harness::new();
        let cfg = MatchConfig::default();
        h.store.insert(
            &cfg.guide_collection,
            vec![Document::new("g1")
                .with_field(FIELD_TITLE, json!("Subdivision"))
                .with_field(FIELD_BODY, json!("Hire a geodetic engineer. File the plan. Wait."))],
        );
        let p = h.pipeline();
        assert_eq!(p.translate_guide("g1").await.unwrap(), GuideTranslation::Translated);
        assert_eq!(
            h.store.field(&cfg.guide_collection, "g1", FIELD_TRANSLATED_TEXT),
            Some(json!("[ceb] Hire a geodetic engineer. File the plan"))
        );
        assert_eq!(p.translate_guide("g1").await.unwrap(), GuideTranslation::Cached);
        assert_eq!(h.translator.calls(), 1);

        assert!(matches!(
            p.translate_guide("nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn translate_guide_extracts_pdf_text_first() {
        let mut h = Harness::new();
        let mut pdf = StubPdf::default();
        pdf.pages.insert(
            "http://pdf/guide".into(),
            "Section one. Section two. Section three.".into(),
        );
        h.pdf = Arc::new(pdf);
        let cfg = MatchConfig::default();
        h.store.insert(
            &cfg.guide_collection,
            vec![Document::new("g2").with_field(FIELD_PDF_URL, json!("http://pdf/guide"))],
        );
        let p = h.pipeline();
        assert_eq!(p.translate_guide("g2").await.unwrap(), GuideTranslation::Translated);
        assert_eq!(
            h.store.field(&cfg.guide_collection, "g2", FIELD_EXTRACTED_TEXT),
            Some(json!("Section one. Section two. Section three."))
        );
        assert_eq!(
            h.store.field(&cfg.guide_collection, "g2", FIELD_TRANSLATED_TEXT),
            Some(json!("[ceb] Section one. Section two"))
        );
    }

    #[tokio::test]
    async fn guide_without_text_is_skipped() {
        let h = Harness::new();
        let cfg = MatchConfig::default();
        h.store
            .insert(&cfg.guide_collection, vec![Document::new("empty")]);
        assert_eq!(
            h.pipeline().translate_guide("empty").await.unwrap(),
            GuideTranslation::Skipped
        );
        assert_eq!(h.translator.calls(), 0);
    }
}
