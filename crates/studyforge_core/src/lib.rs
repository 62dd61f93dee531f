pub mod client;
pub mod domain;
pub mod extract;
pub mod pack;
pub mod ports;
pub mod quiz;
pub mod scheduler;
pub mod tutor;

pub use client::{GenerationClient, PromptTemplate};
pub use domain::{
    ChatRole, ChatTurn, ContentSource, Flashcard, NormalizedContent, QuizQuestion, ReviewOutcome,
    ReviewState, SourceKind, StudyPack,
};
pub use extract::SourceExtractor;
pub use pack::{PackGenerator, PACK_QUIZ_QUESTIONS};
pub use ports::{
    CaptionService, DocumentTextService, ExtractError, GenError, GenerationRequest,
    GenerationService, PageFetcher, PortError, PortResult, StudyStore,
};
pub use quiz::QuizGenerator;
pub use scheduler::{review, MIN_EASINESS};
pub use tutor::Tutor;
