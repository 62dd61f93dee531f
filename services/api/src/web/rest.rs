//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use studyforge_core::client::PromptTemplate;
use studyforge_core::domain::{
    ChatRole, ChatTurn, ContentSource, Flashcard, NormalizedContent, QuizQuestion, ReviewOutcome,
    ReviewState, SourceKind, StudyPack,
};
use studyforge_core::ports::{ExtractError, GenError, GenerationRequest, PortError};
use studyforge_core::scheduler;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_pack_handler,
        upload_pack_handler,
        list_packs_handler,
        get_pack_handler,
        delete_pack_handler,
        generate_quiz_handler,
        review_flashcard_handler,
        chat_handler,
    ),
    components(
        schemas(
            CreatePackRequest,
            SourcePayload,
            StudyPackResponse,
            PackSummaryResponse,
            FlashcardResponse,
            ReviewStateResponse,
            QuizQuestionResponse,
            QuizRequest,
            QuizResponse,
            ReviewRequest,
            ReviewOutcomePayload,
            ReviewResponse,
            ChatRequest,
            ChatTurnPayload,
            ChatRolePayload,
            ChatResponse,
        )
    ),
    tags(
        (name = "Studyforge API", description = "API endpoints for study pack generation, review scheduling, and tutoring.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Payload Structs
//=========================================================================================

/// One content source named in a create-pack request.
#[derive(Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourcePayload {
    /// Raw pasted text.
    Text { text: String },
    /// A web article to fetch.
    WebUrl { url: String },
    /// A video URL; unrecognized hosts are treated as web pages.
    VideoUrl { url: String },
}

impl From<SourcePayload> for ContentSource {
    fn from(payload: SourcePayload) -> Self {
        match payload {
            SourcePayload::Text { text } => ContentSource::Text(text),
            SourcePayload::WebUrl { url } => ContentSource::WebUrl(url),
            SourcePayload::VideoUrl { url } => ContentSource::VideoUrl(url),
        }
    }
}

/// The request payload for generating a pack from a non-file source.
#[derive(Deserialize, ToSchema)]
pub struct CreatePackRequest {
    pub source: SourcePayload,
}

/// The request payload for a standalone quiz.
#[derive(Deserialize, ToSchema)]
pub struct QuizRequest {
    /// How many questions to ask the generator for.
    pub count: u32,
}

/// How well the user recalled the flashcard.
#[derive(Deserialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcomePayload {
    Easy,
    Medium,
    Hard,
}

impl From<ReviewOutcomePayload> for ReviewOutcome {
    fn from(payload: ReviewOutcomePayload) -> Self {
        match payload {
            ReviewOutcomePayload::Easy => ReviewOutcome::Easy,
            ReviewOutcomePayload::Medium => ReviewOutcome::Medium,
            ReviewOutcomePayload::Hard => ReviewOutcome::Hard,
        }
    }
}

/// The request payload for reviewing one flashcard.
#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub outcome: ReviewOutcomePayload,
    /// When set, a short model-written explanation of the new schedule is
    /// included in the response. It is presentational only and never
    /// influences the computed review state.
    #[serde(default)]
    pub include_rationale: bool,
}

#[derive(Deserialize, Serialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRolePayload {
    User,
    Assistant,
}

/// One prior turn of a tutoring conversation, resent by the caller.
#[derive(Deserialize, Serialize, ToSchema, Clone)]
pub struct ChatTurnPayload {
    pub role: ChatRolePayload,
    pub content: String,
}

impl From<ChatTurnPayload> for ChatTurn {
    fn from(payload: ChatTurnPayload) -> Self {
        let role = match payload.role {
            ChatRolePayload::User => ChatRole::User,
            ChatRolePayload::Assistant => ChatRole::Assistant,
        };
        ChatTurn {
            role,
            content: payload.content,
        }
    }
}

/// The request payload for asking the tutor a question.
#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The session so far, oldest turn first. The caller owns this and
    /// appends both the question and the returned answer itself.
    #[serde(default)]
    pub history: Vec<ChatTurnPayload>,
    pub question: String,
}

//=========================================================================================
// API Response Structs
//=========================================================================================

/// A complete study pack as returned to the client.
#[derive(Serialize, ToSchema)]
pub struct StudyPackResponse {
    pub id: Uuid,
    pub title: String,
    pub flashcards: Vec<FlashcardResponse>,
    pub quiz: Vec<QuizQuestionResponse>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardResponse {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    pub review: ReviewStateResponse,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewStateResponse {
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_date: Option<NaiveDate>,
    pub easiness_factor: f64,
    pub repetitions: u32,
    pub interval_days: u32,
}

#[derive(Serialize, ToSchema)]
pub struct QuizQuestionResponse {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// A pack as it appears in list responses, without its full contents.
#[derive(Serialize, ToSchema)]
pub struct PackSummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub flashcard_count: usize,
    pub quiz_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestionResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewResponse {
    pub flashcard_id: Uuid,
    pub review: ReviewStateResponse,
    /// Present only when the caller asked for a rationale and the
    /// generation call succeeded.
    pub rationale: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
}

fn review_state_response(state: &ReviewState) -> ReviewStateResponse {
    ReviewStateResponse {
        last_reviewed: state.last_reviewed,
        next_review_date: state.next_review_date,
        easiness_factor: state.easiness_factor,
        repetitions: state.repetitions,
        interval_days: state.interval_days,
    }
}

fn flashcard_response(card: &Flashcard) -> FlashcardResponse {
    FlashcardResponse {
        id: card.id,
        front: card.front.clone(),
        back: card.back.clone(),
        review: review_state_response(&card.review_state),
    }
}

fn question_response(question: &QuizQuestion) -> QuizQuestionResponse {
    QuizQuestionResponse {
        id: question.id,
        question: question.question.clone(),
        options: question.options.clone(),
        correct_answer: question.correct_answer.clone(),
    }
}

fn pack_response(pack: &StudyPack) -> StudyPackResponse {
    StudyPackResponse {
        id: pack.id,
        title: pack.title.clone(),
        flashcards: pack.flashcards.iter().map(flashcard_response).collect(),
        quiz: pack.quiz.iter().map(question_response).collect(),
        summary: pack.summary.clone(),
        created_at: pack.created_at,
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps extraction failures onto response codes the client can act on:
/// 400 means "change your input", 422 means "the source didn't cooperate".
fn extract_error_response(e: ExtractError) -> (StatusCode, String) {
    let status = match e {
        ExtractError::EmptyContent | ExtractError::UnsupportedFormat(_) => {
            StatusCode::BAD_REQUEST
        }
        ExtractError::FetchError { .. }
        | ExtractError::TranscriptUnavailable(_)
        | ExtractError::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

/// Generation failures are upstream trouble: worth retrying, so they map
/// to gateway-style codes rather than 4xx.
fn gen_error_response(e: GenError) -> (StatusCode, String) {
    let status = match e {
        GenError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GenError::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_GATEWAY),
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Unexpected(message) => {
            error!("Store error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal storage error".to_string(),
            )
        }
    }
}

/// Pulls the owning user out of the `x-user-id` header.
fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;

    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

/// Loads a pack and checks that it belongs to the caller. A pack owned
/// by someone else is reported as not found rather than forbidden, so
/// the API does not leak which pack ids exist.
async fn fetch_owned_pack(
    app_state: &AppState,
    pack_id: Uuid,
    user_id: Uuid,
) -> Result<StudyPack, (StatusCode, String)> {
    let pack = app_state
        .store
        .get_study_pack(pack_id)
        .await
        .map_err(port_error_response)?;
    if pack.user_id != user_id {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Study pack {} not found", pack_id),
        ));
    }
    Ok(pack)
}

//=========================================================================================
// Pack Creation Handlers
//=========================================================================================

/// Runs extract → generate → persist for one source and returns the pack.
async fn build_and_store_pack(
    app_state: &AppState,
    user_id: Uuid,
    source: ContentSource,
) -> Result<StudyPack, (StatusCode, String)> {
    let content = app_state
        .extractor
        .extract(source)
        .await
        .map_err(extract_error_response)?;

    // Dropping this handler (client gone) drops the in-flight generation
    // with it; the token exists so both branches stop together.
    let cancel = CancellationToken::new();
    let pack = app_state
        .packs
        .generate_pack(user_id, &content, &cancel)
        .await
        .map_err(gen_error_response)?;

    app_state
        .store
        .create_study_pack(&pack)
        .await
        .map_err(port_error_response)?;

    Ok(pack)
}

/// Create a study pack from pasted text or a URL.
#[utoipa::path(
    post,
    path = "/packs",
    request_body = CreatePackRequest,
    responses(
        (status = 201, description = "Study pack generated and stored", body = StudyPackResponse),
        (status = 400, description = "Bad request (missing header, empty or unusable input)"),
        (status = 422, description = "The source could not be extracted"),
        (status = 502, description = "Generation failed upstream"),
        (status = 504, description = "Generation timed out")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_pack_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreatePackRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let pack = build_and_store_pack(&app_state, user_id, request.source.into()).await?;
    Ok((StatusCode::CREATED, Json(pack_response(&pack))))
}

/// Create a study pack from an uploaded document.
///
/// Accepts a multipart/form-data request with a single file part; the
/// part's content type decides which extractor handles it.
#[utoipa::path(
    post,
    path = "/packs/upload",
    request_body(content_type = "multipart/form-data", description = "The document to study."),
    responses(
        (status = 201, description = "Study pack generated and stored", body = StudyPackResponse),
        (status = 400, description = "Bad request (missing header, file, or unsupported format)"),
        (status = 422, description = "The document could not be extracted"),
        (status = 502, description = "Generation failed upstream")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn upload_pack_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read multipart data: {}", e),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "Multipart form must include a file".to_string(),
            )
        })?;

    let mime = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read file bytes: {}", e),
        )
    })?;

    let source = ContentSource::Document {
        bytes: bytes.to_vec(),
        mime,
    };
    let pack = build_and_store_pack(&app_state, user_id, source).await?;
    Ok((StatusCode::CREATED, Json(pack_response(&pack))))
}

//=========================================================================================
// Pack Retrieval Handlers
//=========================================================================================

/// List the caller's study packs, newest first.
#[utoipa::path(
    get,
    path = "/packs",
    responses(
        (status = 200, description = "The caller's packs", body = [PackSummaryResponse]),
        (status = 400, description = "Missing or invalid x-user-id header")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_packs_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let packs = app_state
        .store
        .list_study_packs(user_id)
        .await
        .map_err(port_error_response)?;

    let summaries: Vec<PackSummaryResponse> = packs
        .iter()
        .map(|pack| PackSummaryResponse {
            id: pack.id,
            title: pack.title.clone(),
            summary: pack.summary.clone(),
            flashcard_count: pack.flashcards.len(),
            quiz_count: pack.quiz.len(),
            created_at: pack.created_at,
        })
        .collect();

    Ok(Json(summaries))
}

/// Fetch one study pack with all of its contents.
#[utoipa::path(
    get,
    path = "/packs/{id}",
    responses(
        (status = 200, description = "The study pack", body = StudyPackResponse),
        (status = 404, description = "No such pack for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "The study pack id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_pack_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pack_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let pack = fetch_owned_pack(&app_state, pack_id, user_id).await?;
    Ok(Json(pack_response(&pack)))
}

/// Delete a study pack and everything in it.
#[utoipa::path(
    delete,
    path = "/packs/{id}",
    responses(
        (status = 204, description = "Pack deleted"),
        (status = 404, description = "No such pack for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "The study pack id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_pack_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pack_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    fetch_owned_pack(&app_state, pack_id, user_id).await?;
    app_state
        .store
        .delete_study_pack(pack_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Quiz, Review, and Chat Handlers
//=========================================================================================

/// Generate a fresh quiz from a pack's source material.
#[utoipa::path(
    post,
    path = "/packs/{id}/quiz",
    request_body = QuizRequest,
    responses(
        (status = 200, description = "The generated quiz", body = QuizResponse),
        (status = 400, description = "Invalid question count"),
        (status = 404, description = "No such pack for this user"),
        (status = 502, description = "Generation failed upstream")
    ),
    params(
        ("id" = Uuid, Path, description = "The study pack id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pack_id): Path<Uuid>,
    Json(request): Json<QuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    if request.count == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "count must be at least 1".to_string(),
        ));
    }

    let pack = fetch_owned_pack(&app_state, pack_id, user_id).await?;

    let content = NormalizedContent {
        text: pack.source_text,
        source_kind: SourceKind::Text,
    };
    let questions = app_state
        .quizzes
        .generate_quiz(&content, request.count)
        .await
        .map_err(gen_error_response)?;

    Ok(Json(QuizResponse {
        questions: questions.iter().map(question_response).collect(),
    }))
}

const RATIONALE_TEMPLATE: PromptTemplate = PromptTemplate::new(
    r#"A flashcard was just reviewed with outcome "{outcome}". Its next review is scheduled in {interval} day(s), after {repetitions} successful repetition(s).

In one sentence, explain to the learner why this spacing makes sense. Do not suggest a different schedule."#,
);

fn rationale_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": { "reasoning": { "type": "string" } },
        "required": ["reasoning"],
        "additionalProperties": false
    })
}

#[derive(Deserialize)]
struct RationaleReply {
    reasoning: String,
}

/// Asks the generation service to narrate an already-computed schedule.
/// The reply is cosmetic; a failure here degrades to "no rationale"
/// rather than failing the review itself.
async fn review_rationale(
    app_state: &AppState,
    outcome: ReviewOutcome,
    state: &ReviewState,
) -> Option<String> {
    let outcome = match outcome {
        ReviewOutcome::Easy => "easy",
        ReviewOutcome::Medium => "medium",
        ReviewOutcome::Hard => "hard",
    };
    let interval = state.interval_days.to_string();
    let repetitions = state.repetitions.to_string();
    let input = RATIONALE_TEMPLATE.render(&[
        ("outcome", outcome),
        ("interval", interval.as_str()),
        ("repetitions", repetitions.as_str()),
    ]);

    let request = GenerationRequest {
        system: None,
        turns: vec![ChatTurn::user(input)],
        schema_name: "review_rationale",
        schema: rationale_schema(),
    };
    match app_state
        .rationale_client
        .generate::<RationaleReply>(request)
        .await
    {
        Ok(reply) => Some(reply.reasoning),
        Err(e) => {
            warn!("Review rationale generation failed: {}", e);
            None
        }
    }
}

/// Record a review outcome for one flashcard.
///
/// The new schedule is computed deterministically and persisted before
/// any rationale text is generated.
#[utoipa::path(
    post,
    path = "/packs/{id}/flashcards/{card_id}/review",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "The updated review state", body = ReviewResponse),
        (status = 404, description = "No such pack or flashcard for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "The study pack id."),
        ("card_id" = Uuid, Path, description = "The flashcard id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn review_flashcard_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((pack_id, card_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let pack = fetch_owned_pack(&app_state, pack_id, user_id).await?;

    let card = pack
        .flashcards
        .iter()
        .find(|card| card.id == card_id)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("Flashcard {} not found in pack {}", card_id, pack_id),
            )
        })?;

    let outcome: ReviewOutcome = request.outcome.into();
    let new_state = scheduler::review(&card.review_state, outcome, Utc::now());

    app_state
        .store
        .update_review_state(pack_id, card_id, &new_state)
        .await
        .map_err(port_error_response)?;

    let rationale = if request.include_rationale {
        review_rationale(&app_state, outcome, &new_state).await
    } else {
        None
    };

    Ok(Json(ReviewResponse {
        flashcard_id: card_id,
        review: review_state_response(&new_state),
        rationale,
    }))
}

/// Ask the tutor a question about a pack's material.
#[utoipa::path(
    post,
    path = "/packs/{id}/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The tutor's answer", body = ChatResponse),
        (status = 404, description = "No such pack for this user"),
        (status = 502, description = "Generation failed upstream")
    ),
    params(
        ("id" = Uuid, Path, description = "The study pack id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(pack_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let pack = fetch_owned_pack(&app_state, pack_id, user_id).await?;

    let history: Vec<ChatTurn> = request.history.into_iter().map(ChatTurn::from).collect();
    let answer = app_state
        .tutor
        .ask(&pack.source_text, &history, &request.question)
        .await
        .map_err(gen_error_response)?;

    Ok(Json(ChatResponse { answer }))
}
