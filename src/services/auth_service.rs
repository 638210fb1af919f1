use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::log_audit,
    config::JwtConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, OAuthProfile, RegisterRequest},
    entity::User,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::user_service,
    state::AppState,
};

pub async fn register(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    user_service::create_user(state, payload).await
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let LoginRequest { email, password } = payload;
    let user = match user_service::get_by_credentials(state, &email, &password).await {
        Ok(user) => user,
        // Unknown email and wrong password look the same to the client.
        Err(AppError::NotFound(_)) => return Err(AppError::InvalidCredentials),
        Err(err) => return Err(err),
    };

    let token = issue_token(&state.config.jwt, &user)?;
    log_audit(
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    );

    Ok(LoginResponse {
        token: format!("Bearer {}", token),
    })
}

/// Sign in with an identity already verified by an OAuth provider.
pub async fn login_with_oauth(
    state: &AppState,
    profile: OAuthProfile,
) -> AppResult<LoginResponse> {
    profile.validate()?;
    let provider = profile.provider.clone();
    let user = user_service::find_or_create_oauth_user(state, profile).await?;
    let token = issue_token(&state.config.jwt, &user)?;

    log_audit(
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "provider": provider })),
    );

    Ok(LoginResponse {
        token: format!("Bearer {}", token),
    })
}

pub fn issue_token(config: &JwtConfig, user: &User) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(config: &JwtConfig, token: &str) -> AppResult<AuthUser> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthenticated("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthenticated("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub(crate) fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    if password_hash.is_empty() {
        return Ok(false);
    }
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
