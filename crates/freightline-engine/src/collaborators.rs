//! External-collaborator traits (SPEC_FULL.md §B): `PdfExtractor` and
//! `MailSource` have no bundled production implementation (spec.md §1
//! treats the mail source and document OCR/extraction vendor as external
//! systems this pipeline integrates with, not builds). Each ships a
//! deterministic stub for tests, standing in for a real vendor behind the
//! same trait the production code calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use freightline_core::model::{Attachment, Message};

/// Failures from the PDF/attachment-text extraction vendor.
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("failed to fetch attachment bytes: {0}")]
    Fetch(String),
    #[error("failed to extract text: {0}")]
    Extraction(String),
}

/// Turns an attachment into extracted text (§4.7 step 3). Implementors own
/// fetching the underlying bytes (by filename, URI, or whatever addressing
/// scheme the real attachment store uses) — `Attachment` itself carries no
/// raw bytes, only extraction metadata.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract(&self, attachment: &Attachment) -> Result<String, PdfExtractError>;
}

/// Failures from the mailbox/transport vendor.
#[derive(Debug, Error)]
pub enum MailSourceError {
    #[error("transport error: {0}")]
    Transport(String),
}

/// Fetches messages for the batch driver (§6 CLI surface `run`). A real
/// implementation talks to IMAP/Graph/Gmail; tests use
/// [`StaticMailSource`].
#[async_trait]
pub trait MailSource: Send + Sync {
    async fn fetch_since(
        &self,
        after: DateTime<Utc>,
        before: Option<DateTime<Utc>>,
        max_results: Option<usize>,
    ) -> Result<Vec<Message>, MailSourceError>;
}

/// Deterministic stub `PdfExtractor`: returns a fixed string regardless of
/// which attachment is asked about. Good enough for pipeline tests that
/// only care that extraction happened and was truncated/aggregated
/// correctly, not that real PDF text was recovered.
pub struct StubPdfExtractor {
    pub text: String,
}

impl StubPdfExtractor {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl PdfExtractor for StubPdfExtractor {
    async fn extract(&self, _attachment: &Attachment) -> Result<String, PdfExtractError> {
        Ok(self.text.clone())
    }
}

/// Deterministic stub `MailSource` serving a fixed, pre-seeded list of
/// messages, filtered by the requested window (§6 `run`'s
/// `{afterTimestamp, beforeTimestamp?, maxResults?}`).
pub struct StaticMailSource {
    messages: Vec<Message>,
}

impl StaticMailSource {
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl MailSource for StaticMailSource {
    async fn fetch_since(
        &self,
        after: DateTime<Utc>,
        before: Option<DateTime<Utc>>,
        max_results: Option<usize>,
    ) -> Result<Vec<Message>, MailSourceError> {
        let mut matched: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.received_at > after)
            .filter(|m| before.is_none_or(|b| m.received_at <= b))
            .cloned()
            .collect();
        matched.sort_by_key(|m| m.received_at);
        if let Some(limit) = max_results {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}
