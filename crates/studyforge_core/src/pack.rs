//! crates/studyforge_core/src/pack.rs
//!
//! Pack generation: fans out to two concurrent generation calls (the
//! base pack of title, flashcards, and summary, plus a fixed-size quiz),
//! joins them with a barrier, and assembles one immutable `StudyPack`.
//! The join is all-or-nothing; no partial pack ever reaches the caller.

const PACK_INSTRUCTIONS: &str = r#"You are a study assistant. From the provided material, produce:
- a short, descriptive title (at most 8 words),
- a set of flashcards covering the material's key facts and ideas, each with a question-style front and a concise answer on the back,
- a summary of a few sentences capturing the material's main points.

Use only the material itself; do not invent facts it does not contain."#;

const PACK_INPUT_TEMPLATE: PromptTemplate = PromptTemplate::new(
    r#"MATERIAL:
---
{content}
---

Create the title, flashcards, and summary for the material above."#,
);

/// Name of the JSON shape the base-pack call must return.
pub const PACK_SCHEMA_NAME: &str = "study_pack_draft";

/// How many quiz questions a generated pack asks for.
pub const PACK_QUIZ_QUESTIONS: u32 = 5;

use chrono::Utc;
use futures::join;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::client::{GenerationClient, PromptTemplate};
use crate::domain::{Flashcard, NormalizedContent, ReviewState, StudyPack};
use crate::ports::{GenError, GenerationRequest};
use crate::quiz::QuizGenerator;

//=========================================================================================
// Draft Shapes Returned by the Model
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackDraft {
    title: String,
    flashcards: Vec<FlashcardDraft>,
    summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlashcardDraft {
    front: String,
    back: String,
}

fn pack_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "flashcards": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "front": { "type": "string" },
                        "back": { "type": "string" }
                    },
                    "required": ["front", "back"],
                    "additionalProperties": false
                }
            },
            "summary": { "type": "string" }
        },
        "required": ["title", "flashcards", "summary"],
        "additionalProperties": false
    })
}

//=========================================================================================
// The Pack Generator
//=========================================================================================

/// Orchestrates the two concurrent generation calls that make up one
/// study pack. Performs no retries; retry policy belongs to the caller.
#[derive(Clone)]
pub struct PackGenerator {
    client: GenerationClient,
    quiz: QuizGenerator,
}

impl PackGenerator {
    /// The quiz branch is delegated to `quiz`, which may run on a
    /// different model than the base-pack call.
    pub fn new(client: GenerationClient, quiz: QuizGenerator) -> Self {
        Self { client, quiz }
    }

    /// Generates a complete study pack for `content`, owned by `user_id`.
    ///
    /// Both sub-requests are issued immediately and both are awaited
    /// before returning, so a failed branch never leaves the other one
    /// running detached. If either branch fails the whole call fails;
    /// cancelling `cancel` abandons both branches cooperatively.
    pub async fn generate_pack(
        &self,
        user_id: Uuid,
        content: &NormalizedContent,
        cancel: &CancellationToken,
    ) -> Result<StudyPack, GenError> {
        info!("Generating study pack from {} chars of content", content.text.len());

        let base = self
            .client
            .generate_cancellable::<PackDraft>(self.base_request(content), cancel);
        let quiz = self
            .quiz
            .generate_quiz_cancellable(content, PACK_QUIZ_QUESTIONS, cancel);

        // Barrier: both branches complete (with a value or an error)
        // before either result is inspected.
        let (base_result, quiz_result) = join!(base, quiz);

        let draft = base_result.map_err(|e| join_failure("base pack", e))?;
        let quiz = quiz_result.map_err(|e| join_failure("quiz", e))?;

        if draft.title.trim().is_empty() {
            return Err(GenError::SchemaMismatch(
                "base pack reply carried an empty title".to_string(),
            ));
        }

        let flashcards = draft
            .flashcards
            .into_iter()
            .map(|card| Flashcard {
                id: Uuid::new_v4(),
                front: card.front,
                back: card.back,
                review_state: ReviewState::initial(),
            })
            .collect();

        Ok(StudyPack {
            id: Uuid::new_v4(),
            user_id,
            title: draft.title,
            flashcards,
            quiz,
            summary: draft.summary,
            source_text: content.text.clone(),
            created_at: Utc::now(),
        })
    }

    fn base_request(&self, content: &NormalizedContent) -> GenerationRequest {
        let input = PACK_INPUT_TEMPLATE.render(&[("content", content.text.as_str())]);
        GenerationRequest {
            system: Some(PACK_INSTRUCTIONS.to_string()),
            turns: vec![crate::domain::ChatTurn::user(input)],
            schema_name: PACK_SCHEMA_NAME,
            schema: pack_schema(),
        }
    }
}

/// Wraps a branch failure so the caller can tell which sub-request sank
/// the join. Cancellation is reported as itself, not as a join failure.
fn join_failure(branch: &'static str, source: GenError) -> GenError {
    match source {
        GenError::Cancelled => GenError::Cancelled,
        other => GenError::PartialJoinFailure {
            branch,
            source: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;
    use crate::ports::GenerationService;
    use crate::quiz::QUIZ_SCHEMA_NAME;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Replies keyed by schema name; names listed in `fail` error out.
    struct CannedService {
        replies: Vec<(&'static str, serde_json::Value)>,
        fail: Option<&'static str>,
    }

    #[async_trait]
    impl GenerationService for CannedService {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<serde_json::Value, GenError> {
            if self.fail == Some(request.schema_name) {
                return Err(GenError::UpstreamRejected("canned failure".to_string()));
            }
            self.replies
                .iter()
                .find(|(name, _)| *name == request.schema_name)
                .map(|(_, reply)| reply.clone())
                .ok_or_else(|| {
                    GenError::UpstreamRejected(format!(
                        "no canned reply for {}",
                        request.schema_name
                    ))
                })
        }
    }

    fn base_reply() -> serde_json::Value {
        json!({
            "title": "Cell Biology Basics",
            "flashcards": [
                { "front": "What organelle produces ATP?", "back": "The mitochondria." },
                { "front": "Where is DNA stored?", "back": "In the nucleus." }
            ],
            "summary": "Cells contain specialized organelles."
        })
    }

    fn quiz_reply() -> serde_json::Value {
        json!({ "questions": [{
            "question": "What organelle produces ATP?",
            "options": ["Mitochondria", "Nucleus", "Ribosome"],
            "correct_answer": "Mitochondria"
        }]})
    }

    fn generator(fail: Option<&'static str>) -> PackGenerator {
        let service = CannedService {
            replies: vec![
                (PACK_SCHEMA_NAME, base_reply()),
                (QUIZ_SCHEMA_NAME, quiz_reply()),
            ],
            fail,
        };
        let client = GenerationClient::new(Arc::new(service), Duration::from_secs(5));
        PackGenerator::new(client.clone(), QuizGenerator::new(client))
    }

    fn content() -> NormalizedContent {
        NormalizedContent {
            text: "Cells contain organelles such as the mitochondria.".to_string(),
            source_kind: SourceKind::Text,
        }
    }

    #[tokio::test]
    async fn successful_join_assembles_a_complete_pack() {
        let pack = generator(None)
            .generate_pack(Uuid::new_v4(), &content(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(pack.title, "Cell Biology Basics");
        assert_eq!(pack.summary, "Cells contain specialized organelles.");
        assert_eq!(pack.flashcards.len(), 2);
        assert_eq!(pack.quiz.len(), 1);
        // Model order is presentation order.
        assert_eq!(pack.flashcards[0].front, "What organelle produces ATP?");
        // Every card starts in the initial review state with a fresh id.
        for card in &pack.flashcards {
            assert_eq!(card.review_state, ReviewState::initial());
        }
        assert_ne!(pack.flashcards[0].id, pack.flashcards[1].id);
    }

    #[tokio::test]
    async fn quiz_branch_failure_fails_the_whole_pack() {
        let err = generator(Some(QUIZ_SCHEMA_NAME))
            .generate_pack(Uuid::new_v4(), &content(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            GenError::PartialJoinFailure { branch, source } => {
                assert_eq!(branch, "quiz");
                assert!(matches!(*source, GenError::UpstreamRejected(_)));
            }
            other => panic!("expected PartialJoinFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn base_branch_failure_fails_the_whole_pack() {
        let err = generator(Some(PACK_SCHEMA_NAME))
            .generate_pack(Uuid::new_v4(), &content(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::PartialJoinFailure { branch: "base pack", .. }
        ));
    }

    #[tokio::test]
    async fn cancelled_request_reports_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = generator(None)
            .generate_pack(Uuid::new_v4(), &content(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Cancelled));
    }
}
