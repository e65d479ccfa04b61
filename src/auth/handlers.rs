use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use crate::AppState;
use crate::auth::AuthContext;
use crate::error::{AppError, AuthError};
use crate::users::{verify_password, NewUser, UserSummary};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(AppError::ValidationError(
                "username and password are required".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for username: {}", req.username);
    req.validate()?;

    let user = match state.users.find_by_username(&req.username).await? {
        Some(user) => user,
        None => {
            warn!("Login failed for username: {}: unknown user", req.username);
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    if !verify_password(&user, &req.password)? {
        warn!("Login failed for username: {}: wrong password", req.username);
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.gate.issue(user.id)?;
    info!(user_id = %user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserSummary::from(&user),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let username_len = self.username.chars().count();
        if !(3..=100).contains(&username_len) {
            return Err(AppError::ValidationError(
                "username must be between 3 and 100 characters".into(),
            ));
        }
        if self.password.chars().count() < 6 {
            return Err(AppError::ValidationError(
                "password must be at least 6 characters".into(),
            ));
        }
        let email_ok = self
            .email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !email_ok {
            return Err(AppError::ValidationError("email is not valid".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", req.username);
    req.validate()?;

    let req = req.into_inner();
    let user = state
        .users
        .create(NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user: UserSummary::from(&user),
    }))
}

/// Echoes the identity the gate attached to this request.
pub async fn me(ctx: AuthContext) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "user_id": ctx.subject(),
        "issued_at": ctx.issued_at().to_rfc3339(),
        "expires_at": ctx.expires_at().to_rfc3339(),
    }))
}
