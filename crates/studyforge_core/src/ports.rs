//! crates/studyforge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, HTTP
//! fetching, or the text-generation service.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{ChatTurn, ReviewState, StudyPack};

//=========================================================================================
// Error Taxonomies
//=========================================================================================

/// Errors produced while turning a content source into normalized text.
///
/// Every branch of the extractor either returns fully normalized text or
/// one of these; partially extracted text is never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("source contained no extractable text")]
    EmptyContent,
    #[error("failed to fetch {url}: {reason}")]
    FetchError { url: String, reason: String },
    #[error("no caption track available for video {0}")]
    TranscriptUnavailable(String),
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("document extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Errors produced by the generation boundary and the orchestration on
/// top of it. These are never swallowed; a failed generation is reported
/// as-is rather than replaced with a placeholder value.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("generation call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model output did not match the expected schema: {0}")]
    SchemaMismatch(String),
    #[error("generation request rejected upstream: {0}")]
    UpstreamRejected(String),
    #[error("pack generation failed in the {branch} branch: {source}")]
    PartialJoinFailure {
        branch: &'static str,
        #[source]
        source: Box<GenError>,
    },
    #[error("generation cancelled by caller")]
    Cancelled,
}

/// A generic error type for persistent-store operations.
/// This abstracts away the specific errors from the external document store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generation Boundary
//=========================================================================================

/// One request to the external text-generation service.
///
/// The caller renders its prompt template into the final user turn before
/// building the request; the service only sees finished message text plus
/// the JSON schema the reply must satisfy.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System framing for the conversation, or `None` when prior turns
    /// already carry it.
    pub system: Option<String>,
    /// Prior turns plus the current user input, oldest first.
    pub turns: Vec<ChatTurn>,
    /// Name of the JSON shape the reply must match.
    pub schema_name: &'static str,
    /// JSON schema for the reply payload.
    pub schema: serde_json::Value,
}

/// The black-box text-generation capability.
///
/// Implementations must be safely callable from concurrent call sites, and
/// must return the model's payload as parsed JSON. A reply that is not
/// valid JSON is a `SchemaMismatch`, not a success with null fields.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<serde_json::Value, GenError>;
}

//=========================================================================================
// Ingestion Boundaries
//=========================================================================================

/// HTTP ingestion boundary for web pages. The adapter owns fetching and
/// markup stripping; it returns the page's visible article text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns its visible body text with script and
    /// style content removed. Non-2xx responses and network failures are
    /// `ExtractError::FetchError`.
    async fn fetch_article_text(&self, url: &str) -> Result<String, ExtractError>;
}

/// Caption-retrieval capability, keyed by the video id parsed from a URL.
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Returns the video's caption segments in playback order, or
    /// `ExtractError::TranscriptUnavailable` when no caption track exists.
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<String>, ExtractError>;
}

/// Document-extraction boundary: raw bytes plus a MIME type in, plain
/// text out.
#[async_trait]
pub trait DocumentTextService: Send + Sync {
    async fn extract_text(&self, bytes: &[u8], mime: &str) -> Result<String, ExtractError>;
}

//=========================================================================================
// Persistent Store Boundary
//=========================================================================================

/// The opaque document store that owns study-pack persistence. The exact
/// schema and wire format belong to the adapter.
#[async_trait]
pub trait StudyStore: Send + Sync {
    /// Persists a freshly generated pack atomically, including all of its
    /// flashcards and quiz questions.
    async fn create_study_pack(&self, pack: &StudyPack) -> PortResult<()>;

    async fn get_study_pack(&self, pack_id: Uuid) -> PortResult<StudyPack>;

    async fn list_study_packs(&self, user_id: Uuid) -> PortResult<Vec<StudyPack>>;

    /// Overwrites one flashcard's review state. Each review event fully
    /// replaces the previous state, so last-write-wins is acceptable.
    async fn update_review_state(
        &self,
        pack_id: Uuid,
        flashcard_id: Uuid,
        state: &ReviewState,
    ) -> PortResult<()>;

    async fn delete_study_pack(&self, pack_id: Uuid) -> PortResult<()>;
}
