mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use crate::config::{EmbeddingBackend, RepositoryBackend, Settings};
use crate::core::{Embedder, HashingEmbedder, Matcher, SentenceEmbedder};
use crate::routes::matches::AppState;
use crate::services::{
    AppwriteCollections, AppwriteRepository, InMemoryRepository, MatchingService, MentorshipRepository,
    PostgresRepository,
};
use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(level: &str, format: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

/// Load the embedding model before anything binds; failure aborts start-up
fn build_embedder(settings: &crate::config::EmbeddingSettings) -> Result<Arc<dyn Embedder>, crate::core::EmbeddingError> {
    Ok(match settings.backend {
        EmbeddingBackend::Sentence => Arc::new(SentenceEmbedder::load(&settings.model_source())?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(settings.hashing_dimension)?),
    })
}

async fn build_repository(settings: &Settings) -> Result<Arc<dyn MentorshipRepository>, services::RepositoryError> {
    let status_filter = settings.repository.status_filter();

    Ok(match settings.repository.backend {
        RepositoryBackend::Postgres => {
            let db = &settings.database;
            Arc::new(
                PostgresRepository::from_settings(
                    &db.url,
                    db.max_connections,
                    db.min_connections,
                    db.acquire_timeout_secs,
                    db.idle_timeout_secs,
                    status_filter,
                )
                .await?,
            )
        }
        RepositoryBackend::Appwrite => {
            let appwrite = settings.appwrite.clone().ok_or_else(|| {
                services::RepositoryError::InvalidData("missing [appwrite] settings".to_string())
            })?;
            Arc::new(
                AppwriteRepository::new(
                    appwrite.endpoint,
                    appwrite.api_key,
                    appwrite.project_id,
                    appwrite.database_id,
                    AppwriteCollections {
                        mentorships: appwrite.mentorships_collection,
                        matches: appwrite.matches_collection,
                    },
                    status_filter,
                    settings.repository.candidate_limit,
                )
                .map_err(services::RepositoryError::from)?,
            )
        }
        RepositoryBackend::Memory => Arc::new(InMemoryRepository::new(status_filter)),
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| io_error("Configuration error", e))?;

    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting mentor matching service...");

    let embedder = build_embedder(&settings.embedding).map_err(|e| {
        error!("Failed to load embedding model: {}", e);
        io_error("Embedding model error", e)
    })?;

    info!("Embedding model ready: {} ({} dimensions)", embedder.model_name(), embedder.dimension());

    let repository = build_repository(&settings).await.map_err(|e| {
        error!("Failed to initialize repository: {}", e);
        io_error("Repository error", e)
    })?;

    info!("Repository initialized ({:?})", settings.repository.backend);

    let policy = settings
        .matching
        .eligibility_policy()
        .map_err(|e| io_error("Configuration error", e))?;

    let matcher = Matcher::new(
        embedder,
        policy,
        settings.embedding.timeout(),
        settings.embedding.max_concurrent,
    );

    info!(
        "Matcher initialized (minimum score {:.2}, policy {:?})",
        settings.matching.minimum_score, policy
    );

    // Build application state
    let app_state = AppState {
        matching: MatchingService::new(repository, matcher, settings.matching.minimum_score),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
