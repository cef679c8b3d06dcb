use futures_util::StreamExt;
use std::time::Duration;
use terrabot_core::{Error, PdfExtractor, PdfFetcher, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_MAX_BYTES: usize = 25 * 1024 * 1024;

/// Downloads PDFs over HTTP with a hard wall-clock budget per document.
#[derive(Debug, Clone)]
pub struct HttpPdfFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpPdfFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = url::Url::parse(url).map_err(|e| Error::Pdf(format!("invalid url: {e}")))?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Pdf(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Pdf(format!("HTTP {status}")));
        }

        // Oversized bodies are cut; extraction of a truncated PDF just yields less text.
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Pdf(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > self.max_bytes {
                let can_take = self.max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                tracing::warn!(max_bytes = self.max_bytes, "pdf body truncated");
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl PdfFetcher for HttpPdfFetcher {
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>> {
        let t0 = std::time::Instant::now();
        let out = tokio::time::timeout(self.timeout, self.download(url))
            .await
            .map_err(|_| Error::PdfTimeout(self.timeout))??;
        tracing::debug!(url, bytes = out.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "pdf fetched");
        Ok(out)
    }
}

/// Pure-Rust text extraction via `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

/// `pdf-extract` panics on some malformed content streams (e.g. `Tj` with no font
/// selected); those panics come back as `Err` like any other parse failure.
pub fn pdf_to_text(bytes: &[u8]) -> std::result::Result<String, String> {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));
    match outcome {
        Ok(r) => r.map_err(|e| e.to_string()),
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "unknown panic".to_string()
            };
            Err(format!("panic in pdf parser: {msg}"))
        }
    }
}

impl PdfExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> String {
        match pdf_to_text(bytes) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "pdf extraction failed");
                String::new()
            }
        }
    }
}
