//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;
use studyforge_core::client::GenerationClient;
use studyforge_core::extract::SourceExtractor;
use studyforge_core::pack::PackGenerator;
use studyforge_core::ports::StudyStore;
use studyforge_core::quiz::QuizGenerator;
use studyforge_core::tutor::Tutor;

/// The shared application state, created once at startup and passed to all handlers.
///
/// Every field is either immutable or internally synchronized, so handlers
/// can run generation calls concurrently without extra locking.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StudyStore>,
    pub extractor: SourceExtractor,
    pub packs: PackGenerator,
    pub quizzes: QuizGenerator,
    pub tutor: Tutor,
    /// Direct handle for the one-off review-rationale calls.
    pub rationale_client: GenerationClient,
}
