use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Identity returned by an OAuth provider after its own handshake.
#[derive(Deserialize, Debug, Clone, Validate)]
pub struct OAuthProfile {
    pub provider: String,
    #[validate(email)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
