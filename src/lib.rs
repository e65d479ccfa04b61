pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod users;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::{AppError, AuthError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthContext, RequireAuth, SubjectId, TokenGate};
pub use users::{InMemoryUserDirectory, UserDirectory};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub gate: Arc<TokenGate>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        let gate = TokenGate::from_config(&config.auth);
        Self::with_parts(config, gate, Arc::new(InMemoryUserDirectory::new()))
    }

    pub fn with_parts(config: Settings, gate: TokenGate, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
            users,
        }
    }
}

/// Registers every route. Protected routes sit behind [`RequireAuth`] built
/// from the state's gate.
pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let require_auth = RequireAuth::new(state.gate.clone());

        cfg.app_data(state)
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(auth::handlers::register))
                            .route("/login", web::post().to(auth::handlers::login))
                            .service(
                                web::resource("/me")
                                    .route(web::get().to(auth::handlers::me))
                                    .wrap(require_auth),
                            ),
                    ),
            );
    }
}
