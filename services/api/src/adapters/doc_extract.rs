//! services/api/src/adapters/doc_extract.rs
//!
//! This module contains the adapter for uploaded-document extraction. It
//! implements the `DocumentTextService` port: PDF text via `pdf-extract`
//! (run on the blocking pool), plain text and markdown as UTF-8.

use async_trait::async_trait;
use studyforge_core::ports::{DocumentTextService, ExtractError};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DocumentTextService` for the supported
/// upload formats.
#[derive(Clone, Default)]
pub struct DocTextAdapter;

impl DocTextAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Strips any `; charset=...` style parameters off a MIME type.
fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

//=========================================================================================
// `DocumentTextService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentTextService for DocTextAdapter {
    async fn extract_text(&self, bytes: &[u8], mime: &str) -> Result<String, ExtractError> {
        match essence(mime) {
            "application/pdf" => {
                // pdf-extract is synchronous and can chew on large files;
                // keep it off the async runtime's worker threads.
                let bytes = bytes.to_vec();
                tokio::task::spawn_blocking(move || {
                    pdf_extract::extract_text_from_mem(&bytes)
                        .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))
                })
                .await
                .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?
            }
            "text/plain" | "text/markdown" => String::from_utf8(bytes.to_vec())
                .map_err(|e| ExtractError::ExtractionFailed(e.to_string())),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_documents_pass_through() {
        let adapter = DocTextAdapter::new();
        let text = adapter
            .extract_text(b"plain notes", "text/plain; charset=utf-8")
            .await
            .unwrap();
        assert_eq!(text, "plain notes");
    }

    #[tokio::test]
    async fn unknown_mime_is_unsupported() {
        let adapter = DocTextAdapter::new();
        let err = adapter
            .extract_text(b"...", "application/msword")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn invalid_utf8_text_is_extraction_failed() {
        let adapter = DocTextAdapter::new();
        let err = adapter
            .extract_text(&[0xff, 0xfe, 0x00], "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }
}
