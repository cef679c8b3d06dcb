//! Ordered retrieval tiers and the orchestrator that walks them.
//!
//! Each tier builds its own candidate pool per call and returns either an answer or
//! `NoMatch`. Collaborator failures inside a tier are logged and degrade to `NoMatch`.

use crate::config::MatchConfig;
use crate::similarity::{best_candidate, closest_match, similarity};
use crate::summary::{summarize, truncate_chars};
use crate::{
    ConversationSource, Document, DocumentStore, Error, Guide, MatchResult, Matched, PdfExtractor,
    PdfFetcher, Query, Translator, CEBUANO, FIELD_TRANSLATED_TEXT, FIELD_URL,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct TierAnswer {
    pub tier: &'static str,
    /// Text to send back (may differ from the matched candidate, e.g. a recorded reply).
    pub text: String,
    pub matched: Matched,
    /// Already in the query's language; the caller must not translate it again.
    pub localized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Answer(TierAnswer),
    NoMatch,
}

#[async_trait::async_trait]
pub trait RetrievalTier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn retrieve(&self, query: &Query) -> TierOutcome;
}

/// Walks tiers in priority order; the first answer short-circuits the rest.
#[derive(Clone, Default)]
pub struct Orchestrator {
    tiers: Vec<Arc<dyn RetrievalTier>>,
}

impl Orchestrator {
    pub fn new(tiers: Vec<Arc<dyn RetrievalTier>>) -> Self {
        Self { tiers }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub async fn run(&self, query: &Query) -> Option<TierAnswer> {
        for tier in &self.tiers {
            match tier.retrieve(query).await {
                TierOutcome::Answer(a) => {
                    tracing::info!(tier = a.tier, score = a.matched.score, "retrieval hit");
                    return Some(a);
                }
                TierOutcome::NoMatch => {
                    tracing::debug!(tier = tier.name(), "no match");
                }
            }
        }
        None
    }
}

/// Match on the historical user turn, answer with the recorded reply.
pub struct DatasetTier {
    source: Arc<dyn ConversationSource>,
    cutoff: f64,
}

impl DatasetTier {
    pub fn new(source: Arc<dyn ConversationSource>, cutoff: f64) -> Self {
        Self { source, cutoff }
    }
}

#[async_trait::async_trait]
impl RetrievalTier for DatasetTier {
    fn name(&self) -> &'static str {
        "dataset"
    }

    async fn retrieve(&self, query: &Query) -> TierOutcome {
        let conversations = match self.source.conversations().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "dataset unavailable");
                return TierOutcome::NoMatch;
            }
        };
        let pairs: Vec<(&str, &str)> = conversations
            .iter()
            .filter_map(|c| Some((c.user_turn()?, c.reply()?)))
            .collect();
        let Some((idx, score)) =
            best_candidate(&query.text, pairs.iter().map(|(q, _)| *q), self.cutoff)
        else {
            return TierOutcome::NoMatch;
        };
        let (user_turn, reply) = pairs[idx];
        TierOutcome::Answer(TierAnswer {
            tier: self.name(),
            text: reply.to_string(),
            matched: Matched {
                text: user_turn.to_string(),
                score,
                source_id: None,
            },
            localized: false,
        })
    }
}

/// Store the Cebuano translation of a guide summary on the guide record.
///
/// Returns the translation, or `None` if the translator failed. A failed write is logged
/// and the translation is still returned.
pub async fn translate_and_cache(
    store: &dyn DocumentStore,
    translator: &dyn Translator,
    collection: &str,
    id: &str,
    summary: &str,
) -> Option<String> {
    let translated = match translator.translate(summary, CEBUANO).await {
        Ok(t) if !t.trim().is_empty() => t,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!(error = %e, guide = id, "guide translation failed");
            return None;
        }
    };
    if let Err(e) = store
        .set_field(
            collection,
            id,
            FIELD_TRANSLATED_TEXT,
            serde_json::Value::String(translated.clone()),
        )
        .await
    {
        tracing::warn!(error = %e, guide = id, "could not cache guide translation");
    }
    Some(translated)
}

/// Knowledge-guide documents: title pass first (higher cutoff), then content lines.
pub struct GuideTier {
    store: Arc<dyn DocumentStore>,
    translator: Arc<dyn Translator>,
    config: MatchConfig,
}

impl GuideTier {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        translator: Arc<dyn Translator>,
        config: MatchConfig,
    ) -> Self {
        Self {
            store,
            translator,
            config,
        }
    }

    fn match_title(&self, query: &str, docs: &[Document]) -> Option<(usize, Matched)> {
        let mut best: Option<(usize, Matched)> = None;
        for (idx, doc) in docs.iter().enumerate() {
            let Some(title) = Guide::new(doc).title() else {
                continue;
            };
            let score = similarity(query, title);
            if score <= self.config.guide_title_cutoff {
                continue;
            }
            if best.as_ref().is_some_and(|(_, m)| score <= m.score) {
                continue;
            }
            best = Some((
                idx,
                Matched {
                    text: title.to_string(),
                    score,
                    source_id: Some(doc.id.clone()),
                },
            ));
        }
        best
    }

    fn match_content(&self, query: &str, docs: &[Document]) -> Option<(usize, Matched)> {
        docs.iter().enumerate().find_map(|(idx, doc)| {
            let lines = Guide::new(doc).content_lines();
            closest_match(query, lines.iter().copied(), self.config.guide_content_cutoff)
                .with_source(&doc.id)
                .into_option()
                .map(|m| (idx, m))
        })
    }
}

#[async_trait::async_trait]
impl RetrievalTier for GuideTier {
    fn name(&self) -> &'static str {
        "guide"
    }

    async fn retrieve(&self, query: &Query) -> TierOutcome {
        let docs = match self.store.list(&self.config.guide_collection).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, collection = %self.config.guide_collection, "guide store unavailable");
                return TierOutcome::NoMatch;
            }
        };
        let hit = self
            .match_title(&query.text, &docs)
            .or_else(|| self.match_content(&query.text, &docs));
        let Some((idx, matched)) = hit else {
            return TierOutcome::NoMatch;
        };
        let guide = Guide::new(&docs[idx]);
        let long = guide.long_text().unwrap_or_else(|| matched.text.clone());
        let summary = summarize(&long, self.config.summary_max_chars);

        if !query.is_cebuano() {
            return TierOutcome::Answer(TierAnswer {
                tier: self.name(),
                text: summary,
                matched,
                localized: false,
            });
        }
        let (text, localized) = match guide.translated_text() {
            Some(cached) => (cached.to_string(), true),
            None => match translate_and_cache(
                self.store.as_ref(),
                self.translator.as_ref(),
                &self.config.guide_collection,
                guide.id(),
                &summary,
            )
            .await
            {
                Some(t) => (t, true),
                // Leave it to the caller's translate-or-original fallback.
                None => (summary, false),
            },
        };
        TierOutcome::Answer(TierAnswer {
            tier: self.name(),
            text,
            matched,
            localized,
        })
    }
}

/// Download + extract a PDF, degrading every failure to an empty string.
pub async fn pdf_text(fetcher: &dyn PdfFetcher, extractor: &dyn PdfExtractor, url: &str) -> String {
    match fetcher.fetch_pdf(url).await {
        Ok(bytes) => extractor.extract(&bytes),
        Err(Error::PdfTimeout(d)) => {
            tracing::warn!(url, timeout_ms = d.as_millis() as u64, "pdf download timed out");
            String::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, url, "pdf download failed");
            String::new()
        }
    }
}

/// Lines of extracted PDF text, per document in store order.
pub struct PdfTier {
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn PdfFetcher>,
    extractor: Arc<dyn PdfExtractor>,
    config: MatchConfig,
}

impl PdfTier {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn PdfFetcher>,
        extractor: Arc<dyn PdfExtractor>,
        config: MatchConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            config,
        }
    }
}

#[async_trait::async_trait]
impl RetrievalTier for PdfTier {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn retrieve(&self, query: &Query) -> TierOutcome {
        let docs = match self.store.list(&self.config.pdf_collection).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, collection = %self.config.pdf_collection, "pdf store unavailable");
                return TierOutcome::NoMatch;
            }
        };
        for doc in &docs {
            let Some(url) = doc.str_field(FIELD_URL) else {
                continue;
            };
            let text = pdf_text(self.fetcher.as_ref(), self.extractor.as_ref(), url).await;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let lines = text.split('\n').filter(|l| !l.trim().is_empty());
            if let MatchResult::Match(m) = closest_match(&query.text, lines, self.config.pdf_cutoff) {
                return TierOutcome::Answer(TierAnswer {
                    tier: self.name(),
                    text: truncate_chars(&m.text, self.config.pdf_snippet_chars),
                    matched: Matched {
                        source_id: Some(doc.id.clone()),
                        ..m
                    },
                    localized: false,
                });
            }
        }
        TierOutcome::NoMatch
    }
}
