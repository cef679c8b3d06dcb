use std::path::PathBuf;
use terrabot_core::{Conversation, ConversationSource, Error, Result};

/// Q/A dataset stored as JSON Lines: one `{"messages": [...]}` object per line.
///
/// Re-read on every call, so edits to the file apply to the next request.
#[derive(Debug, Clone)]
pub struct JsonlDataset {
    path: PathBuf,
}

impl JsonlDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parse JSONL text; malformed lines are logged and skipped.
pub fn parse_jsonl(raw: &str) -> Vec<Conversation> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str::<Conversation>(line) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "skipping malformed dataset line");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl ConversationSource for JsonlDataset {
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Dataset(format!("{}: {e}", self.path.display())))?;
        let items = parse_jsonl(&raw);
        tracing::debug!(path = %self.path.display(), conversations = items.len(), "dataset read");
        Ok(items)
    }
}
