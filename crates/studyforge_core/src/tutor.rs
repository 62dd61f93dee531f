//! crates/studyforge_core/src/tutor.rs
//!
//! The conversational tutor: a bounded-context chat loop that answers
//! questions strictly from one pack's material plus the prior turns of
//! the session. The caller owns the history; this component keeps no
//! memory between calls.

const TUTOR_FRAMING: &str = r#"You are a tutor helping a student understand one specific piece of study material.

Rules:
- Answer ONLY from the material provided in the conversation. Do not use outside knowledge.
- If the material does not contain the answer, say so plainly instead of guessing.
- Keep answers short, concrete, and in plain language.
- When it helps, quote or paraphrase the relevant part of the material."#;

const FIRST_TURN_TEMPLATE: PromptTemplate = PromptTemplate::new(
    r#"MATERIAL:
---
{content}
---

QUESTION:
{question}"#,
);

/// Name of the JSON shape every tutor reply must match.
pub const TUTOR_SCHEMA_NAME: &str = "tutor_reply";

use serde::Deserialize;
use serde_json::json;

use crate::client::{GenerationClient, PromptTemplate};
use crate::domain::ChatTurn;
use crate::ports::{GenError, GenerationRequest};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TutorReply {
    answer: String,
}

fn tutor_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "answer": { "type": "string" }
        },
        "required": ["answer"],
        "additionalProperties": false
    })
}

/// Stateless question answering over one content string. Each call is
/// independent; concurrent calls share nothing.
#[derive(Clone)]
pub struct Tutor {
    client: GenerationClient,
}

impl Tutor {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    /// Answers `question` from `content`, continuing the conversation in
    /// `history`.
    ///
    /// The system framing and the material itself are injected only on
    /// the first turn of a session (`history` empty); later turns rely on
    /// the history carrying both, and pass the question through verbatim.
    /// The caller appends the new user turn and the returned answer to
    /// its own history.
    pub async fn ask(
        &self,
        content: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String, GenError> {
        let (system, input) = if history.is_empty() {
            let input =
                FIRST_TURN_TEMPLATE.render(&[("content", content), ("question", question)]);
            (Some(TUTOR_FRAMING.to_string()), input)
        } else {
            (None, question.to_string())
        };

        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(input));

        let reply: TutorReply = self
            .client
            .generate(GenerationRequest {
                system,
                turns,
                schema_name: TUTOR_SCHEMA_NAME,
                schema: tutor_schema(),
            })
            .await?;

        Ok(reply.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatRole;
    use crate::ports::GenerationService;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Records every request it sees and answers with a fixed reply.
    struct RecordingService {
        seen: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationService for RecordingService {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<serde_json::Value, GenError> {
            self.seen.lock().await.push(request);
            Ok(json!({ "answer": "The mitochondria." }))
        }
    }

    fn tutor() -> (Tutor, Arc<RecordingService>) {
        let service = Arc::new(RecordingService {
            seen: Mutex::new(Vec::new()),
        });
        let tutor = Tutor::new(GenerationClient::new(
            service.clone(),
            Duration::from_secs(5),
        ));
        (tutor, service)
    }

    #[tokio::test]
    async fn first_turn_injects_framing_and_material() {
        let (tutor, service) = tutor();
        let answer = tutor
            .ask("Cells contain mitochondria.", &[], "What makes ATP?")
            .await
            .unwrap();
        assert_eq!(answer, "The mitochondria.");

        let seen = service.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert!(seen[0].system.is_some());
        assert_eq!(seen[0].turns.len(), 1);
        assert!(seen[0].turns[0].content.contains("Cells contain mitochondria."));
        assert!(seen[0].turns[0].content.contains("What makes ATP?"));
    }

    #[tokio::test]
    async fn later_turns_reuse_history_without_reframing() {
        let (tutor, service) = tutor();
        let history = vec![
            ChatTurn::user("MATERIAL: ... QUESTION: What makes ATP?"),
            ChatTurn::assistant("The mitochondria."),
        ];
        tutor
            .ask("Cells contain mitochondria.", &history, "How many are there?")
            .await
            .unwrap();

        let seen = service.seen.lock().await;
        assert_eq!(seen.len(), 1);
        // No re-injected framing and no repeated material block.
        assert!(seen[0].system.is_none());
        assert_eq!(seen[0].turns.len(), 3);
        assert_eq!(seen[0].turns[0].content, history[0].content);
        assert_eq!(seen[0].turns[1].role, ChatRole::Assistant);
        assert_eq!(seen[0].turns[2].content, "How many are there?");
    }
}
