use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use std::net::TcpListener;
use token_gate::config::CorsConfig;
use token_gate::middleware::RequestLogger;
use token_gate::{configure, AppState, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        Cors::default()
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // A missing JWT secret is fatal here; there is no fallback key.
    let config = Settings::new().context("failed to load configuration")?;
    info!("Configuration loaded successfully (environment: {})", config.environment);

    if config.cors.enabled && config.cors.allow_any_origin {
        warn!("CORS allows any origin");
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Starting server at {}", address);

    let workers = config.server.workers as usize;
    let cors_config = config.cors.clone();
    let state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_config))
            .wrap(RequestLogger)
            .configure(configure(state.clone()))
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .context("server terminated with an error")?;

    Ok(())
}
