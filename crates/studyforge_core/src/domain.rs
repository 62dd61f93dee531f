//! crates/studyforge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format,
//! except where a type crosses the generation or REST boundary and needs
//! serde derives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One piece of learning material, as handed to the source extractor.
///
/// Consumed exactly once; never persisted in this form.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Raw text pasted by the user.
    Text(String),
    /// A web page to fetch and strip down to its article text.
    WebUrl(String),
    /// A video URL. Recognized video-host URLs use the caption track;
    /// anything else falls through to the web-page path.
    VideoUrl(String),
    /// An uploaded document (raw bytes plus the client-reported MIME type).
    Document { bytes: Vec<u8>, mime: String },
}

/// Which kind of source a piece of normalized content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Text,
    Web,
    Video,
    Document,
}

/// Plain-text representation of a content source, independent of its
/// origin format. `text` is non-empty, whitespace-collapsed UTF-8 with
/// no markup. Created by the source extractor and never mutated.
#[derive(Debug, Clone)]
pub struct NormalizedContent {
    pub text: String,
    pub source_kind: SourceKind,
}

/// The generated bundle of title, flashcards, quiz, and summary for one
/// content source. Immutable after creation except for each flashcard's
/// review state.
#[derive(Debug, Clone)]
pub struct StudyPack {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    pub summary: String,
    /// The normalized source text the pack was generated from. Kept so the
    /// tutor and standalone quiz generation work off the same material.
    pub source_text: String,
    pub created_at: DateTime<Utc>,
}

/// A single front/back flashcard. `front` and `back` are set once at
/// generation time; only `review_state` changes afterwards.
#[derive(Debug, Clone)]
pub struct Flashcard {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    pub review_state: ReviewState,
}

/// Per-flashcard spaced-repetition bookkeeping.
///
/// A card that has never been reviewed has `repetitions == 0` and both
/// dates unset; a hard review also resets `repetitions` to 0 while
/// keeping its dates. Mutated only by the review scheduler, once per
/// review event, monotonically advancing `last_reviewed`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewState {
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_date: Option<NaiveDate>,
    pub easiness_factor: f64,
    pub repetitions: u32,
    pub interval_days: u32,
}

impl ReviewState {
    /// The state every flashcard starts in when its pack is created.
    pub fn initial() -> Self {
        Self {
            last_reviewed: None,
            next_review_date: None,
            easiness_factor: 2.5,
            repetitions: 0,
            interval_days: 0,
        }
    }
}

/// A multiple-choice quiz question. `correct_answer` is always one of
/// `options`, and `options` holds at least two unique entries.
#[derive(Debug, Clone)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// How well the user recalled a flashcard at review time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Easy,
    Medium,
    Hard,
}

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a tutoring conversation. The caller owns the ordered,
/// append-only history; this crate never stores turns between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
