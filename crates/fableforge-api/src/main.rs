//! Fableforge API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fableforge_api::routes;
use fableforge_api::state::AppState;
use fableforge_broadcast::BroadcastHub;
use fableforge_core::clock::SystemClock;
use fableforge_core::config::EngineConfig;
use fableforge_generation::{
    GenerationService, HttpGenerationService, HttpImageBackend, IllustrationGenerator,
    generate_object,
};
use fableforge_session::{GeneratedCharacter, Session, prompts};
use fableforge_world::{GameMode, Scene, WorldState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Fableforge API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("PORT must be a valid u16: {e}"))?;

    let config = EngineConfig::from_env();
    let service: Arc<dyn GenerationService> = Arc::new(HttpGenerationService::from_env());
    let hub = Arc::new(BroadcastHub::new(config.listener_queue_capacity));

    // Illustration rendering is optional; without an image endpoint the
    // session runs text-only.
    let illustrations = std::env::var("FABLEFORGE_IMAGE_BASE_URL").ok().map(|base_url| {
        let model =
            std::env::var("FABLEFORGE_IMAGE_MODEL").unwrap_or_else(|_| "sdxl".to_owned());
        let output_dir = PathBuf::from(
            std::env::var("FABLEFORGE_IMAGE_DIR").unwrap_or_else(|_| "static/images".to_owned()),
        );
        IllustrationGenerator::spawn(
            Arc::new(HttpImageBackend::new(&base_url, &model)),
            Arc::clone(&hub),
            output_dir,
        )
    });

    let world = bootstrap_world(service.as_ref(), &config).await?;
    let keepalive_interval = config.keepalive_interval;
    let session = Session::new(
        world,
        config,
        service,
        Arc::new(SystemClock),
        Arc::clone(&hub),
        illustrations,
    )
    .spawn();

    let app_state = AppState::new(session, keepalive_interval);

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::session::router())
        .nest("/api", routes::world::router())
        .nest("/api/characters", routes::characters::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the opening world from environment configuration.
///
/// `FABLEFORGE_PREMISE` seeds the scene and narrative context;
/// `FABLEFORGE_INITIAL_MODE` picks the starting mode; `FABLEFORGE_ROSTER`
/// is a semicolon-separated list of character descriptions generated at
/// startup, with `(NPC)` marking system-controlled ones. An empty roster
/// is fine; participants can join through the character endpoint.
async fn bootstrap_world(
    service: &dyn GenerationService,
    config: &EngineConfig,
) -> Result<WorldState, Box<dyn Error>> {
    let premise = std::env::var("FABLEFORGE_PREMISE")
        .unwrap_or_else(|_| "A forest thicket at midnight.".to_owned());
    let mode = match std::env::var("FABLEFORGE_INITIAL_MODE").as_deref() {
        Ok("COMBAT") => GameMode::Combat,
        _ => GameMode::Narrative,
    };

    let mut characters = Vec::new();
    if let Ok(roster) = std::env::var("FABLEFORGE_ROSTER") {
        for description in roster.split(';').map(str::trim).filter(|d| !d.is_empty()) {
            let prompt = prompts::new_character(description, &premise);
            let generated: GeneratedCharacter =
                generate_object(service, &prompt, &config.language).await?;
            let mut character = generated.0;
            character.is_player = !description.to_uppercase().contains("(NPC)");
            tracing::info!(
                name = %character.name,
                is_player = character.is_player,
                "generated starting character"
            );
            characters.push(character);
        }
    }

    Ok(WorldState::new(
        Scene::placeholder(&premise),
        characters,
        mode,
        &premise,
        config.event_log_capacity,
    ))
}
