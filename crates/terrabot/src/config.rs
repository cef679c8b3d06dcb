use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use terrabot_core::chat::{ChatPipeline, Collaborators};
use terrabot_core::config::{MatchConfig, OffTopicPolicy};
use terrabot_core::{Conversation, ConversationSource, DocumentStore};
use terrabot_local::dataset::JsonlDataset;
use terrabot_local::firestore::FirestoreStore;
use terrabot_local::lang::KeywordDetector;
use terrabot_local::memory::MemoryStore;
use terrabot_local::openai_compat::OpenAiCompatClient;
use terrabot_local::pdf::{HttpPdfFetcher, PdfTextExtractor};

/// Every runtime knob, from flags or `TERRABOT_*` environment variables.
#[derive(clap::Args, Debug, Clone)]
pub struct Settings {
    /// JSON Lines file of prior conversations (dataset tier).
    #[arg(long, env = "TERRABOT_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Firestore project id. Without it, documents come from `--seed-file` (or nothing).
    #[arg(long, env = "TERRABOT_FIRESTORE_PROJECT")]
    pub firestore_project: Option<String>,
    #[arg(long, env = "TERRABOT_FIRESTORE_BASE_URL", default_value = terrabot_local::firestore::DEFAULT_BASE_URL)]
    pub firestore_base_url: String,
    /// OAuth bearer token for Firestore REST calls.
    #[arg(long, env = "TERRABOT_FIRESTORE_TOKEN", hide_env_values = true)]
    pub firestore_token: Option<String>,

    /// JSON seed for the in-memory document store: `{"<collection>": [{"id": ..}, ..]}`.
    #[arg(long, env = "TERRABOT_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    #[arg(long, env = "TERRABOT_GUIDE_COLLECTION", default_value = "knowledge_guides")]
    pub guide_collection: String,
    #[arg(long, env = "TERRABOT_PDF_COLLECTION", default_value = "pdfs")]
    pub pdf_collection: String,

    #[arg(long, env = "TERRABOT_LLM_BASE_URL", default_value = terrabot_local::openai_compat::DEFAULT_BASE_URL)]
    pub llm_base_url: String,
    /// Falls back to OPENAI_API_KEY.
    #[arg(long, env = "TERRABOT_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
    #[arg(long, env = "TERRABOT_LLM_MODEL", default_value = terrabot_local::openai_compat::DEFAULT_MODEL)]
    pub llm_model: String,
    /// Model used for translations (default: --llm-model).
    #[arg(long, env = "TERRABOT_TRANSLATION_MODEL")]
    pub translation_model: Option<String>,
    #[arg(long, env = "TERRABOT_LLM_TIMEOUT_MS", default_value_t = 60_000)]
    pub llm_timeout_ms: u64,

    #[arg(long, env = "TERRABOT_DATASET_CUTOFF", default_value_t = 0.7)]
    pub dataset_cutoff: f64,
    #[arg(long, env = "TERRABOT_GUIDE_TITLE_CUTOFF", default_value_t = 0.8)]
    pub guide_title_cutoff: f64,
    #[arg(long, env = "TERRABOT_GUIDE_CONTENT_CUTOFF", default_value_t = 0.6)]
    pub guide_content_cutoff: f64,
    #[arg(long, env = "TERRABOT_PDF_CUTOFF", default_value_t = 0.6)]
    pub pdf_cutoff: f64,
    #[arg(long, env = "TERRABOT_SUMMARY_MAX_CHARS", default_value_t = 1000)]
    pub summary_max_chars: usize,
    #[arg(long, env = "TERRABOT_PDF_SNIPPET_CHARS", default_value_t = 500)]
    pub pdf_snippet_chars: usize,
    #[arg(long, env = "TERRABOT_PDF_TIMEOUT_MS", default_value_t = 30_000)]
    pub pdf_timeout_ms: u64,

    /// Off-topic handling: reject (403) or redirect (200).
    #[arg(long, env = "TERRABOT_OFF_TOPIC", default_value = "reject")]
    pub off_topic: OffTopicPolicy,
}

/// Dataset tier with no file configured.
struct NoDataset;

#[async_trait::async_trait]
impl ConversationSource for NoDataset {
    async fn conversations(&self) -> terrabot_core::Result<Vec<Conversation>> {
        Ok(Vec::new())
    }
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Settings {
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            dataset_cutoff: self.dataset_cutoff,
            guide_title_cutoff: self.guide_title_cutoff,
            guide_content_cutoff: self.guide_content_cutoff,
            pdf_cutoff: self.pdf_cutoff,
            summary_max_chars: self.summary_max_chars,
            pdf_snippet_chars: self.pdf_snippet_chars,
            guide_collection: self.guide_collection.clone(),
            pdf_collection: self.pdf_collection.clone(),
        }
    }

    fn llm_api_key(&self) -> Option<String> {
        self.llm_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    async fn document_store(&self, client: &reqwest::Client) -> anyhow::Result<Arc<dyn DocumentStore>> {
        if let Some(project) = self.firestore_project.as_deref().filter(|p| !p.trim().is_empty()) {
            tracing::info!(project, "using firestore document store");
            let store = FirestoreStore::new(client.clone(), project, self.firestore_token.clone())
                .with_base_url(&self.firestore_base_url);
            return Ok(Arc::new(store));
        }
        match &self.seed_file {
            Some(path) => {
                let store = MemoryStore::from_json_file(path)
                    .await
                    .with_context(|| format!("load seed file {}", path.display()))?;
                tracing::info!(path = %path.display(), "using seeded in-memory document store");
                Ok(Arc::new(store))
            }
            None => {
                tracing::warn!("no document store configured; guide and pdf tiers will never match");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    /// Wire the real collaborators into a pipeline.
    pub async fn pipeline(&self) -> anyhow::Result<ChatPipeline> {
        let client = terrabot_local::http_client(Duration::from_millis(
            self.llm_timeout_ms.max(self.pdf_timeout_ms),
        ))?;

        let conversations: Arc<dyn ConversationSource> = match &self.dataset {
            Some(path) => Arc::new(JsonlDataset::new(path)),
            None => {
                tracing::warn!("no dataset configured; dataset tier will never match");
                Arc::new(NoDataset)
            }
        };

        let mut llm = OpenAiCompatClient::new(
            client.clone(),
            &self.llm_base_url,
            self.llm_api_key(),
            &self.llm_model,
        )
        .with_timeout(Duration::from_millis(self.llm_timeout_ms));
        if let Some(m) = self.translation_model.as_deref().filter(|m| !m.trim().is_empty()) {
            llm = llm.with_translation_model(m);
        }
        if !llm.has_api_key() {
            tracing::warn!("no LLM api key configured; completion and translation will fail");
        }
        let llm = Arc::new(llm);
        let pdf_fetcher =
            HttpPdfFetcher::new(client.clone()).with_timeout(Duration::from_millis(self.pdf_timeout_ms));

        let services = Collaborators {
            store: self.document_store(&client).await?,
            conversations,
            pdf_fetcher: Arc::new(pdf_fetcher),
            pdf_extractor: Arc::new(PdfTextExtractor),
            detector: Arc::new(KeywordDetector),
            translator: llm.clone(),
            completion: llm,
        };
        Ok(ChatPipeline::new(services, self.match_config(), self.off_topic))
    }

    /// Which collaborators are configured. Booleans and names only; never secret values.
    pub fn doctor_report(&self) -> serde_json::Value {
        let dataset_readable = self.dataset.as_ref().map(|p| p.is_file());
        serde_json::json!({
            "schema_version": 1,
            "kind": "doctor",
            "name": "terrabot",
            "version": env!("CARGO_PKG_VERSION"),
            "configured": {
                "dataset": self.dataset.is_some(),
                "dataset_readable": dataset_readable.unwrap_or(false),
                "firestore": non_empty(&self.firestore_project),
                "firestore_token": non_empty(&self.firestore_token),
                "seed_file": self.seed_file.is_some(),
                "llm_api_key": self.llm_api_key().is_some(),
            },
            "match": self.match_config(),
            "off_topic": self.off_topic,
        })
    }
}
