//! crates/studyforge_core/src/extract.rs
//!
//! The source extractor: converts one `ContentSource` into normalized
//! plain text. Fetching, caption retrieval, and document parsing happen
//! behind ports; this module owns source classification, whitespace
//! normalization, and the rule that an error never carries partial text.

use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::domain::{ContentSource, NormalizedContent, SourceKind};
use crate::ports::{CaptionService, DocumentTextService, ExtractError, PageFetcher};

/// Collapses every run of whitespace to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pulls the video id out of a recognized video-hosting URL.
///
/// Recognized shapes are the platform's canonical host (`youtube.com`,
/// including subdomains) with a `/watch?v=`, `/shorts/`, `/embed/`, or
/// `/live/` path, and the short-link host (`youtu.be`) with the id as the
/// first path segment. Anything else is not classified as a video URL.
pub fn video_id(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    let host = url.host_str()?;

    if host == "youtu.be" {
        let id = url.path_segments()?.find(|s| !s.is_empty())?.to_string();
        return Some(id);
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if url.path() == "/watch" {
            let id = url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string())?;
            if id.is_empty() {
                return None;
            }
            return Some(id);
        }
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
        if let Some(prefix) = segments.next() {
            if matches!(prefix, "shorts" | "embed" | "live") {
                return segments.next().map(|id| id.to_string());
            }
        }
    }

    None
}

/// Converts heterogeneous content sources into a single plain-text
/// representation. Holds the three ingestion ports and nothing else.
#[derive(Clone)]
pub struct SourceExtractor {
    pages: Arc<dyn PageFetcher>,
    captions: Arc<dyn CaptionService>,
    documents: Arc<dyn DocumentTextService>,
}

impl SourceExtractor {
    pub fn new(
        pages: Arc<dyn PageFetcher>,
        captions: Arc<dyn CaptionService>,
        documents: Arc<dyn DocumentTextService>,
    ) -> Self {
        Self {
            pages,
            captions,
            documents,
        }
    }

    /// Extracts and normalizes `source`. Either returns a fully normalized
    /// result or an `ExtractError`; partially normalized text is never
    /// surfaced.
    pub async fn extract(&self, source: ContentSource) -> Result<NormalizedContent, ExtractError> {
        match source {
            ContentSource::Text(text) => finish(&text, SourceKind::Text),
            ContentSource::WebUrl(url) => self.extract_web(&url).await,
            ContentSource::VideoUrl(url) => match video_id(&url) {
                Some(id) => self.extract_video(&id).await,
                // Not a recognized video URL shape; treat it as a web page.
                None => self.extract_web(&url).await,
            },
            ContentSource::Document { bytes, mime } => {
                let text = self.documents.extract_text(&bytes, &mime).await?;
                finish(&text, SourceKind::Document)
            }
        }
    }

    async fn extract_web(&self, url: &str) -> Result<NormalizedContent, ExtractError> {
        info!("Extracting article text from {}", url);
        let text = self.pages.fetch_article_text(url).await?;
        finish(&text, SourceKind::Web)
    }

    async fn extract_video(&self, video_id: &str) -> Result<NormalizedContent, ExtractError> {
        info!("Fetching caption track for video {}", video_id);
        let segments = self.captions.fetch_captions(video_id).await?;
        let joined = segments.join(" ");
        finish(&joined, SourceKind::Video)
    }
}

/// Final normalization step shared by every branch.
fn finish(text: &str, source_kind: SourceKind) -> Result<NormalizedContent, ExtractError> {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return Err(ExtractError::EmptyContent);
    }
    Ok(NormalizedContent { text, source_kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubPages {
        text: Option<String>,
    }

    #[async_trait]
    impl PageFetcher for StubPages {
        async fn fetch_article_text(&self, url: &str) -> Result<String, ExtractError> {
            self.text.clone().ok_or_else(|| ExtractError::FetchError {
                url: url.to_string(),
                reason: "HTTP 404".to_string(),
            })
        }
    }

    struct StubCaptions {
        segments: Option<Vec<String>>,
    }

    #[async_trait]
    impl CaptionService for StubCaptions {
        async fn fetch_captions(&self, video_id: &str) -> Result<Vec<String>, ExtractError> {
            self.segments
                .clone()
                .ok_or_else(|| ExtractError::TranscriptUnavailable(video_id.to_string()))
        }
    }

    struct StubDocuments;

    #[async_trait]
    impl DocumentTextService for StubDocuments {
        async fn extract_text(&self, bytes: &[u8], mime: &str) -> Result<String, ExtractError> {
            if mime != "text/plain" {
                return Err(ExtractError::UnsupportedFormat(mime.to_string()));
            }
            String::from_utf8(bytes.to_vec())
                .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))
        }
    }

    fn extractor(pages: StubPages, captions: StubCaptions) -> SourceExtractor {
        SourceExtractor::new(Arc::new(pages), Arc::new(captions), Arc::new(StubDocuments))
    }

    fn default_extractor() -> SourceExtractor {
        extractor(
            StubPages {
                text: Some("a web page".to_string()),
            },
            StubCaptions {
                segments: Some(vec!["first".to_string(), "second".to_string()]),
            },
        )
    }

    #[tokio::test]
    async fn text_is_whitespace_collapsed() {
        let content = default_extractor()
            .extract(ContentSource::Text("  a   b  ".to_string()))
            .await
            .unwrap();
        assert_eq!(content.text, "a b");
        assert_eq!(content.source_kind, SourceKind::Text);
    }

    #[tokio::test]
    async fn blank_text_is_empty_content() {
        let err = default_extractor()
            .extract(ContentSource::Text("   \n\t ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyContent));
    }

    #[tokio::test]
    async fn video_url_joins_caption_segments() {
        let content = default_extractor()
            .extract(ContentSource::VideoUrl(
                "https://www.youtube.com/watch?v=abc123".to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(content.text, "first second");
        assert_eq!(content.source_kind, SourceKind::Video);
    }

    #[tokio::test]
    async fn missing_caption_track_is_transcript_unavailable() {
        let extractor = extractor(
            StubPages {
                text: Some("irrelevant".to_string()),
            },
            StubCaptions { segments: None },
        );
        let err = extractor
            .extract(ContentSource::VideoUrl(
                "https://youtu.be/abc123".to_string(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::TranscriptUnavailable(_)));
    }

    #[tokio::test]
    async fn unrecognized_video_url_falls_through_to_web() {
        // youtube.com with no watchable path is not classified as a video.
        let content = default_extractor()
            .extract(ContentSource::VideoUrl(
                "https://www.youtube.com/".to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(content.source_kind, SourceKind::Web);
        assert_eq!(content.text, "a web page");
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let extractor = extractor(
            StubPages { text: None },
            StubCaptions { segments: None },
        );
        let err = extractor
            .extract(ContentSource::WebUrl("https://example.com/x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::FetchError { .. }));
    }

    #[tokio::test]
    async fn unsupported_document_format_is_rejected() {
        let err = default_extractor()
            .extract(ContentSource::Document {
                bytes: b"%PDF-1.4".to_vec(),
                mime: "application/x-unknown".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn video_id_recognizes_standard_and_short_links() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id("https://m.youtube.com/shorts/xyz789").as_deref(),
            Some("xyz789")
        );
        assert_eq!(video_id("https://www.youtube.com/"), None);
        assert_eq!(video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(video_id("not a url"), None);
    }
}
