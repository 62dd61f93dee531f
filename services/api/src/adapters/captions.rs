//! services/api/src/adapters/captions.rs
//!
//! This module contains the adapter for video caption retrieval. It
//! implements the `CaptionService` port against the host's public
//! timedtext endpoint, which returns the caption track as simple XML.

use async_trait::async_trait;
use regex::Regex;
use studyforge_core::ports::{CaptionService, ExtractError};

const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CaptionService` by downloading the
/// English caption track for a video id.
#[derive(Clone)]
pub struct TimedTextCaptions {
    client: reqwest::Client,
    segment_pattern: Regex,
}

impl TimedTextCaptions {
    /// Creates a new `TimedTextCaptions` sharing an existing HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        // The track body is a flat list of <text start=".." dur="..">..</text>
        // elements; a non-greedy capture is enough to walk them in order.
        let segment_pattern = Regex::new(r"(?s)<text[^>]*>(.*?)</text>")
            .expect("caption segment pattern is valid");
        Self {
            client,
            segment_pattern,
        }
    }
}

//=========================================================================================
// `CaptionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CaptionService for TimedTextCaptions {
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<String>, ExtractError> {
        let url = format!("{}?lang=en&v={}", TIMEDTEXT_URL, video_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExtractError::FetchError {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::FetchError {
                url,
                reason: format!("HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| ExtractError::FetchError {
            url,
            reason: e.to_string(),
        })?;

        let segments: Vec<String> = self
            .segment_pattern
            .captures_iter(&body)
            .map(|capture| {
                html_escape::decode_html_entities(&capture[1])
                    .trim()
                    .to_string()
            })
            .filter(|segment| !segment.is_empty())
            .collect();

        // The endpoint answers 200 with an empty body when the video has
        // no caption track.
        if segments.is_empty() {
            return Err(ExtractError::TranscriptUnavailable(video_id.to_string()));
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_pattern_walks_the_track_in_order() {
        let captions = TimedTextCaptions::new(reqwest::Client::new());
        let body = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.0" dur="2.1">Hello &amp; welcome</text>
            <text start="2.1" dur="3.0">to the course</text>
        </transcript>"#;

        let segments: Vec<String> = captions
            .segment_pattern
            .captures_iter(body)
            .map(|c| html_escape::decode_html_entities(&c[1]).trim().to_string())
            .collect();

        assert_eq!(segments, vec!["Hello & welcome", "to the course"]);
    }
}
