use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::{
    audit::log_audit,
    dto::auth::{ChangePasswordRequest, OAuthProfile, RegisterRequest},
    email::{EmailMessage, send_in_background},
    entity::{User, user::PROVIDERS},
    error::{AppError, AppResult},
    field::{FieldValue, UpdateFields},
    middleware::auth::{AuthUser, ensure_admin, ensure_self_or_admin},
    services::{auth_service, card_service, strip_fields},
    state::AppState,
};

/// Never writable through `update_user`; each has its own operation.
const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "password",
    "customer_id",
    "provider",
    "email_verified",
    "role",
];

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn create_user(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    payload.validate()?;
    check_password_length(state, &payload.password)?;

    let email = normalize_email(&payload.email);
    let password_hash = auth_service::hash_password(&payload.password)?;
    let now = Utc::now();
    let mut user = User {
        id: Uuid::new_v4(),
        email,
        password: password_hash,
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone: payload.phone,
        role: "user".to_string(),
        email_verified: false,
        provider: "local".to_string(),
        customer_id: None,
        created_at: now,
        updated_at: now,
    };

    {
        let _guard = state.identity_lock.lock().await;
        if email_exists(state, &user.email).await? {
            return Err(AppError::Conflict("Email is already taken".to_string()));
        }
        state.users.save(&user)?;
    }
    user.password.clear();

    log_audit(
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    );
    send_verification(state, &user);

    Ok(user)
}

pub async fn get_user(state: &AppState, id: Uuid) -> AppResult<User> {
    Ok(state.users.find_by_id(&id)?.redacted())
}

pub async fn list_users(state: &AppState, actor: &AuthUser) -> AppResult<Vec<User>> {
    ensure_admin(actor)?;
    let mut users: Vec<User> = state
        .users
        .find()?
        .into_iter()
        .map(User::redacted)
        .collect();
    users.sort_by_key(|u| u.created_at);
    Ok(users)
}

pub async fn update_user(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
    fields: UpdateFields,
) -> AppResult<User> {
    ensure_self_or_admin(actor, id)?;
    let mut fields = strip_fields(fields, PROTECTED_FIELDS);

    let _guard = state.identity_lock.lock().await;
    let new_email = fields
        .get("email")
        .and_then(FieldValue::as_string)
        .map(normalize_email);
    let mut email_changed = false;
    if let Some(email) = new_email {
        if !email.validate_email() {
            return Err(AppError::BadRequest(format!("Invalid email {email}")));
        }
        match state.users.find_by_field("email", email.as_str())? {
            Some(owner) if owner.id != id => {
                return Err(AppError::Conflict("Email is already taken".to_string()));
            }
            Some(_) => {}
            None => {
                email_changed = true;
                fields.insert("email_verified".to_string(), false.into());
            }
        }
        fields.insert("email".to_string(), FieldValue::String(email));
    }

    let user = state.users.update(&id, fields)?;
    if email_changed {
        send_verification(state, &user);
    }
    log_audit(
        Some(actor.user_id),
        "user_update",
        Some("users"),
        Some(serde_json::json!({ "user_id": id })),
    );
    Ok(user.redacted())
}

/// Delete a user together with the addresses and cards they own. Cards are
/// detached upstream first; if that fails nothing else is removed.
pub async fn delete_user(state: &AppState, actor: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_self_or_admin(actor, id)?;
    state.users.find_by_id(&id)?;

    for card in state.cards.find_where("user_id", "==", id)? {
        card_service::forget_card(state, &card).await?;
    }
    for address in state.addresses.find_where("user_id", "==", id)? {
        if let Err(err) = state.addresses.remove(&address.id) {
            tracing::warn!(error = %err, address_id = %address.id, "orphan address cleanup failed");
        }
    }
    state.users.remove(&id)?;

    log_audit(
        Some(actor.user_id),
        "user_delete",
        Some("users"),
        Some(serde_json::json!({ "user_id": id })),
    );
    Ok(())
}

/// `NotFound` if no user has this email, `InvalidCredentials` if the
/// password does not match.
pub async fn get_by_credentials(state: &AppState, email: &str, password: &str) -> AppResult<User> {
    let user = find_by_email(state, email)?;
    if !auth_service::verify_password(password, &user.password)? {
        return Err(AppError::InvalidCredentials);
    }
    Ok(user.redacted())
}

pub async fn email_exists(state: &AppState, email: &str) -> AppResult<bool> {
    match find_by_email(state, email) {
        Ok(_) => Ok(true),
        Err(AppError::NotFound(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

pub async fn verify_email(state: &AppState, user_id: Uuid) -> AppResult<User> {
    let mut fields = UpdateFields::new();
    fields.insert("email_verified".to_string(), true.into());
    let user = state.users.update(&user_id, fields)?;

    log_audit(Some(user_id), "email_verified", Some("users"), None);
    Ok(user.redacted())
}

pub async fn update_password(
    state: &AppState,
    actor: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<()> {
    let stored = state.users.find_by_id(&actor.user_id)?;
    if !auth_service::verify_password(&payload.current_password, &stored.password)? {
        return Err(AppError::InvalidCredentials);
    }
    check_password_length(state, &payload.new_password)?;

    let mut fields = UpdateFields::new();
    fields.insert(
        "password".to_string(),
        auth_service::hash_password(&payload.new_password)?.into(),
    );
    state.users.update(&actor.user_id, fields)?;

    log_audit(Some(actor.user_id), "password_change", Some("users"), None);
    Ok(())
}

pub async fn set_role(
    state: &AppState,
    actor: &AuthUser,
    user_id: Uuid,
    role: &str,
) -> AppResult<User> {
    ensure_admin(actor)?;
    let mut fields = UpdateFields::new();
    fields.insert("role".to_string(), role.into());
    let user = state.users.update(&user_id, fields)?;

    log_audit(
        Some(actor.user_id),
        "role_change",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id, "role": role })),
    );
    Ok(user.redacted())
}

/// Existing account for the profile's email, or a new verified account
/// without a local password.
pub async fn find_or_create_oauth_user(state: &AppState, profile: OAuthProfile) -> AppResult<User> {
    if profile.provider == "local" || !PROVIDERS.contains(&profile.provider.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported provider {}",
            profile.provider
        )));
    }
    let email = normalize_email(&profile.email);

    let _guard = state.identity_lock.lock().await;
    if let Some(existing) = state.users.find_by_field("email", email.as_str())? {
        if existing.email_verified {
            return Ok(existing.redacted());
        }
        // An unverified local password does not survive the provider's check.
        let mut fields = UpdateFields::new();
        fields.insert("email_verified".to_string(), true.into());
        fields.insert("password".to_string(), FieldValue::String(String::new()));
        let user = state.users.update(&existing.id, fields)?;

        log_audit(
            Some(user.id),
            "oauth_link",
            Some("users"),
            Some(serde_json::json!({ "user_id": user.id, "provider": profile.provider })),
        );
        return Ok(user.redacted());
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email,
        password: String::new(),
        first_name: profile.first_name,
        last_name: profile.last_name,
        phone: None,
        role: "user".to_string(),
        email_verified: true,
        provider: profile.provider,
        customer_id: None,
        created_at: now,
        updated_at: now,
    };
    state.users.save(&user)?;

    log_audit(
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "provider": user.provider })),
    );
    Ok(user)
}

fn send_verification(state: &AppState, user: &User) {
    send_in_background(
        state,
        EmailMessage::new(
            state,
            user.email.clone(),
            "Verify your email address",
            "verify_email",
            serde_json::json!({ "user_id": user.id, "first_name": user.first_name }),
        ),
    );
}

fn find_by_email(state: &AppState, email: &str) -> AppResult<User> {
    state
        .users
        .find_by_field("email", normalize_email(email))?
        .ok_or(AppError::NotFound("User"))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password_length(state: &AppState, password: &str) -> AppResult<()> {
    let min = state.config.min_password_length;
    if (password.chars().count() as u64) < min {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {min} characters"
        )));
    }
    Ok(())
}
