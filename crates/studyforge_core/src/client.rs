//! crates/studyforge_core/src/client.rs
//!
//! The typed layer over the raw `GenerationService` port. It renders
//! prompt templates, bounds every call with the caller-supplied timeout,
//! validates the returned JSON against the expected Rust shape, and
//! supports cooperative cancellation of in-flight calls.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::ports::{GenError, GenerationRequest, GenerationService};

//=========================================================================================
// Prompt Templates
//=========================================================================================

/// A prompt template with `{name}` placeholders, rendered by simple
/// substitution before the request is built.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    text: &'static str,
}

impl PromptTemplate {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    /// Replaces each `{name}` placeholder with its value. Unknown
    /// placeholders are left in place so a malformed template shows up in
    /// the prompt rather than silently disappearing.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut rendered = self.text.to_string();
        for (name, value) in vars {
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        rendered
    }
}

//=========================================================================================
// The Typed Generation Client
//=========================================================================================

/// A cheaply clonable handle to the generation service, carrying the
/// per-call timeout. All orchestration components go through this client
/// rather than the raw port.
#[derive(Clone)]
pub struct GenerationClient {
    service: Arc<dyn GenerationService>,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(service: Arc<dyn GenerationService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Issues one generation call and deserializes the reply into `T`.
    ///
    /// A reply that does not match `T` is a `SchemaMismatch`; exceeding
    /// the configured timeout is a `Timeout`, never a hang.
    pub async fn generate<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
    ) -> Result<T, GenError> {
        let raw = tokio::time::timeout(self.timeout, self.service.generate(request))
            .await
            .map_err(|_| GenError::Timeout(self.timeout))??;

        serde_json::from_value(raw).map_err(|e| GenError::SchemaMismatch(e.to_string()))
    }

    /// Like [`generate`](Self::generate), but abandons the call when
    /// `cancel` fires. The dropped future stops the in-flight request
    /// cooperatively and the caller sees `GenError::Cancelled`.
    pub async fn generate_cancellable<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<T, GenError> {
        tokio::select! {
            // Checked first so an already-abandoned call never starts.
            biased;
            _ = cancel.cancelled() => Err(GenError::Cancelled),
            result = self.generate(request) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Reply {
        answer: String,
    }

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

    struct SlowService;

    #[async_trait]
    impl GenerationService for SlowService {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<serde_json::Value, GenError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({ "answer": "too late" }))
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: None,
            turns: vec![crate::domain::ChatTurn::user("hello")],
            schema_name: "reply",
            schema: json!({ "type": "object" }),
        }
    }

    #[test]
    fn render_replaces_placeholders() {
        let template = PromptTemplate::new("QUESTION: {question}\nCOUNT: {count}");
        let rendered = template.render(&[("question", "why?"), ("count", "5")]);
        assert_eq!(rendered, "QUESTION: why?\nCOUNT: 5");
    }

    #[tokio::test]
    async fn valid_reply_deserializes() {
        let client = GenerationClient::new(
            Arc::new(CannedService {
                reply: json!({ "answer": "ok" }),
            }),
            Duration::from_secs(5),
        );
        let reply: Reply = client.generate(request()).await.unwrap();
        assert_eq!(reply.answer, "ok");
    }

    #[tokio::test]
    async fn mismatched_reply_is_schema_mismatch_not_success() {
        let client = GenerationClient::new(
            Arc::new(CannedService {
                reply: json!({ "unexpected": 1 }),
            }),
            Duration::from_secs(5),
        );
        let err = client.generate::<Reply>(request()).await.unwrap_err();
        assert!(matches!(err, GenError::SchemaMismatch(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_surfaces_timeout() {
        let client =
            GenerationClient::new(Arc::new(SlowService), Duration::from_millis(50));
        let err = client.generate::<Reply>(request()).await.unwrap_err();
        assert!(matches!(err, GenError::Timeout(_)));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_the_call() {
        let client = GenerationClient::new(
            Arc::new(SlowService),
            Duration::from_secs(120),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .generate_cancellable::<Reply>(request(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Cancelled));
    }
}
