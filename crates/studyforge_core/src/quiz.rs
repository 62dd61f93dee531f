//! crates/studyforge_core/src/quiz.rs
//!
//! Quiz generation: a single structured generation call producing N
//! multiple-choice questions from normalized content. Used standalone and
//! as the quiz branch of pack generation.

const QUIZ_INSTRUCTIONS: &str = r#"You are a quiz author. Write multiple-choice questions that test understanding of the provided material only.

Rules:
- Every question must be answerable from the material alone.
- Each question has one correct answer and at least three plausible distractors.
- Options must be distinct; the correct answer must be copied verbatim into the options list.
- Keep questions and options short and unambiguous."#;

const QUIZ_INPUT_TEMPLATE: PromptTemplate = PromptTemplate::new(
    r#"MATERIAL:
---
{content}
---

Write {count} multiple-choice questions about the material above."#,
);

/// Name of the JSON shape the quiz call must return.
pub const QUIZ_SCHEMA_NAME: &str = "quiz_draft";

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::{GenerationClient, PromptTemplate};
use crate::domain::{NormalizedContent, QuizQuestion};
use crate::ports::{GenError, GenerationRequest};

//=========================================================================================
// Draft Shapes Returned by the Model
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuizDraft {
    questions: Vec<QuizQuestionDraft>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuizQuestionDraft {
    question: String,
    options: Vec<String>,
    correct_answer: String,
}

fn quiz_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string" },
                        "options": { "type": "array", "items": { "type": "string" } },
                        "correct_answer": { "type": "string" }
                    },
                    "required": ["question", "options", "correct_answer"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

//=========================================================================================
// The Quiz Generator
//=========================================================================================

/// Produces an ordered list of quiz questions from normalized content in
/// one generation call.
#[derive(Clone)]
pub struct QuizGenerator {
    client: GenerationClient,
}

impl QuizGenerator {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    /// Generates roughly `count` questions. The count is a generation
    /// parameter, not a post-hoc filter: a reply with a different number
    /// of questions is accepted, but a reply with a structurally invalid
    /// question (fewer than two options, duplicate options, or a correct
    /// answer missing from its own options) is a `SchemaMismatch`.
    pub async fn generate_quiz(
        &self,
        content: &NormalizedContent,
        count: u32,
    ) -> Result<Vec<QuizQuestion>, GenError> {
        let draft: QuizDraft = self.client.generate(self.request(content, count)).await?;
        validate_draft(draft)
    }

    /// The pack generator's entry point: same call, but abandoned when the
    /// pack request is cancelled.
    pub(crate) async fn generate_quiz_cancellable(
        &self,
        content: &NormalizedContent,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuizQuestion>, GenError> {
        let draft: QuizDraft = self
            .client
            .generate_cancellable(self.request(content, count), cancel)
            .await?;
        validate_draft(draft)
    }

    fn request(&self, content: &NormalizedContent, count: u32) -> GenerationRequest {
        let count = count.to_string();
        let input = QUIZ_INPUT_TEMPLATE.render(&[
            ("content", content.text.as_str()),
            ("count", count.as_str()),
        ]);
        GenerationRequest {
            system: Some(QUIZ_INSTRUCTIONS.to_string()),
            turns: vec![crate::domain::ChatTurn::user(input)],
            schema_name: QUIZ_SCHEMA_NAME,
            schema: quiz_schema(),
        }
    }
}

/// Checks the per-question invariants and assigns fresh ids, preserving
/// the model's question order.
fn validate_draft(draft: QuizDraft) -> Result<Vec<QuizQuestion>, GenError> {
    draft
        .questions
        .into_iter()
        .map(|q| {
            if q.options.len() < 2 {
                return Err(GenError::SchemaMismatch(format!(
                    "question '{}' has fewer than two options",
                    q.question
                )));
            }
            for (i, option) in q.options.iter().enumerate() {
                if q.options[..i].contains(option) {
                    return Err(GenError::SchemaMismatch(format!(
                        "question '{}' repeats the option '{}'",
                        q.question, option
                    )));
                }
            }
            if !q.options.contains(&q.correct_answer) {
                return Err(GenError::SchemaMismatch(format!(
                    "question '{}' lists a correct answer that is not among its options",
                    q.question
                )));
            }
            Ok(QuizQuestion {
                id: Uuid::new_v4(),
                question: q.question,
                options: q.options,
                correct_answer: q.correct_answer,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;
    use crate::ports::GenerationService;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct CannedService {
        reply: serde_json::Value,
    }

    #[async_trait]
    impl GenerationService for CannedService {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<serde_json::Value, GenError> {
            Ok(self.reply.clone())
        }
    }

    fn generator(reply: serde_json::Value) -> QuizGenerator {
        QuizGenerator::new(GenerationClient::new(
            Arc::new(CannedService { reply }),
            Duration::from_secs(5),
        ))
    }

    fn content() -> NormalizedContent {
        NormalizedContent {
            text: "The mitochondria is the powerhouse of the cell.".to_string(),
            source_kind: SourceKind::Text,
        }
    }

    fn question(correct: &str, options: &[&str]) -> serde_json::Value {
        json!({
            "question": "What is the powerhouse of the cell?",
            "options": options,
            "correct_answer": correct
        })
    }

    #[tokio::test]
    async fn well_formed_questions_get_fresh_ids_in_order() {
        let reply = json!({ "questions": [
            question("Mitochondria", &["Mitochondria", "Nucleus", "Ribosome"]),
            question("Nucleus", &["Mitochondria", "Nucleus"]),
        ]});
        let quiz = generator(reply).generate_quiz(&content(), 2).await.unwrap();
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz[0].correct_answer, "Mitochondria");
        assert_eq!(quiz[1].correct_answer, "Nucleus");
        assert_ne!(quiz[0].id, quiz[1].id);
    }

    #[tokio::test]
    async fn count_is_not_enforced_after_the_fact() {
        // Asked for five, got one back; that is still a valid quiz.
        let reply = json!({ "questions": [
            question("Mitochondria", &["Mitochondria", "Nucleus"]),
        ]});
        let quiz = generator(reply).generate_quiz(&content(), 5).await.unwrap();
        assert_eq!(quiz.len(), 1);
    }

    #[tokio::test]
    async fn correct_answer_missing_from_options_is_schema_mismatch() {
        let reply = json!({ "questions": [
            question("Golgi apparatus", &["Mitochondria", "Nucleus"]),
        ]});
        let err = generator(reply)
            .generate_quiz(&content(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn single_option_question_is_schema_mismatch() {
        let reply = json!({ "questions": [
            question("Mitochondria", &["Mitochondria"]),
        ]});
        let err = generator(reply)
            .generate_quiz(&content(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn duplicate_options_are_schema_mismatch() {
        let reply = json!({ "questions": [
            question("Mitochondria", &["Mitochondria", "Mitochondria", "Nucleus"]),
        ]});
        let err = generator(reply)
            .generate_quiz(&content(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::SchemaMismatch(_)));
    }
}
