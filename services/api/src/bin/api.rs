//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, DocTextAdapter, HttpPageFetcher, OpenAiGenAdapter, TimedTextCaptions},
    config::Config,
    error::ApiError,
    web::{
        chat_handler, create_pack_handler, delete_pack_handler, generate_quiz_handler,
        get_pack_handler, list_packs_handler, rest::ApiDoc, review_flashcard_handler,
        state::AppState, upload_pack_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use studyforge_core::{
    client::GenerationClient, extract::SourceExtractor, pack::PackGenerator,
    quiz::QuizGenerator, tutor::Tutor,
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    // One client per generation concern, so each can run its own model.
    let pack_client = GenerationClient::new(
        Arc::new(OpenAiGenAdapter::new(
            openai_client.clone(),
            config.pack_model.clone(),
        )),
        config.generation_timeout,
    );
    let quiz_client = GenerationClient::new(
        Arc::new(OpenAiGenAdapter::new(
            openai_client.clone(),
            config.quiz_model.clone(),
        )),
        config.generation_timeout,
    );
    let tutor_client = GenerationClient::new(
        Arc::new(OpenAiGenAdapter::new(
            openai_client.clone(),
            config.tutor_model.clone(),
        )),
        config.generation_timeout,
    );
    let rationale_client = GenerationClient::new(
        Arc::new(OpenAiGenAdapter::new(
            openai_client,
            config.rationale_model.clone(),
        )),
        config.generation_timeout,
    );

    let page_fetcher = HttpPageFetcher::new()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let captions = TimedTextCaptions::new(page_fetcher.client());

    let extractor = SourceExtractor::new(
        Arc::new(page_fetcher),
        Arc::new(captions),
        Arc::new(DocTextAdapter::new()),
    );

    // --- 4. Build the Shared AppState ---
    let quizzes = QuizGenerator::new(quiz_client);
    let app_state = Arc::new(AppState {
        store: db_adapter,
        extractor,
        packs: PackGenerator::new(pack_client, quizzes.clone()),
        quizzes,
        tutor: Tutor::new(tutor_client),
        rationale_client,
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/packs", post(create_pack_handler).get(list_packs_handler))
        .route("/packs/upload", post(upload_pack_handler))
        .route(
            "/packs/{id}",
            get(get_pack_handler).delete(delete_pack_handler),
        )
        .route("/packs/{id}/quiz", post(generate_quiz_handler))
        .route(
            "/packs/{id}/flashcards/{card_id}/review",
            post(review_flashcard_handler),
        )
        .route("/packs/{id}/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
