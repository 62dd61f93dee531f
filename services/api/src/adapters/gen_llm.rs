//! services/api/src/adapters/gen_llm.rs
//!
//! This module contains the adapter for the text-generation service.
//! It implements the `GenerationService` port from the `core` crate using
//! an OpenAI-compatible chat-completions API with a JSON-schema response
//! format, so every reply is parsed JSON or a typed error.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use studyforge_core::domain::{ChatRole, ChatTurn};
use studyforge_core::ports::{GenError, GenerationRequest, GenerationService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGenAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenAdapter {
    /// Creates a new `OpenAiGenAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn turn_to_message(turn: &ChatTurn) -> Result<ChatCompletionRequestMessage, GenError> {
        let message = match turn.role {
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(request_error)?
                .into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(request_error)?
                .into(),
        };
        Ok(message)
    }
}

fn request_error(e: OpenAIError) -> GenError {
    GenError::UpstreamRejected(e.to_string())
}

//=========================================================================================
// `GenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationService for OpenAiGenAdapter {
    async fn generate(&self, request: GenerationRequest) -> Result<serde_json::Value, GenError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(system) = &request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()
                    .map_err(request_error)?
                    .into(),
            );
        }
        for turn in &request.turns {
            messages.push(Self::turn_to_message(turn)?);
        }

        // Constrain the reply to the caller's schema; the typed client
        // still validates the parsed value on its side.
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                name: request.schema_name.to_string(),
                description: None,
                schema: Some(request.schema.clone()),
                strict: Some(true),
            },
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(response_format)
            .build()
            .map_err(request_error)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| match e {
                OpenAIError::ApiError(api) => GenError::UpstreamRejected(api.message),
                other => GenError::UpstreamRejected(other.to_string()),
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenError::SchemaMismatch("reply contained no message content".to_string())
            })?;

        serde_json::from_str(&content).map_err(|e| GenError::SchemaMismatch(e.to_string()))
    }
}
