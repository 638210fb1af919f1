use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::log_audit,
    dto::addresses::CreateAddressRequest,
    entity::Address,
    error::{AppError, AppResult},
    field::UpdateFields,
    middleware::auth::AuthUser,
    services::strip_fields,
    state::AppState,
};

const PROTECTED_FIELDS: &[&str] = &["id", "user_id", "created_at", "updated_at"];

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<Address> {
    payload.validate()?;
    if !state.users.exists(&user.user_id) {
        return Err(AppError::OwnerNotFound);
    }

    let now = Utc::now();
    let address = Address {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        title: payload.title,
        line1: payload.line1,
        line2: payload.line2,
        city: payload.city,
        postal_code: payload.postal_code,
        country: payload.country,
        phone: payload.phone,
        created_at: now,
        updated_at: now,
    };
    state.addresses.save(&address)?;

    log_audit(
        Some(user.user_id),
        "address_create",
        Some("addresses"),
        Some(serde_json::json!({ "address_id": address.id })),
    );
    Ok(address)
}

pub async fn get_address(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Address> {
    let address = state.addresses.find_by_id(&id)?;
    can_mutate(user, &address)?;
    Ok(address)
}

pub async fn list_addresses(state: &AppState, user: &AuthUser) -> AppResult<Vec<Address>> {
    let mut addresses = state.addresses.find_where("user_id", "==", user.user_id)?;
    addresses.sort_by_key(|a| a.created_at);
    Ok(addresses)
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    fields: UpdateFields,
) -> AppResult<Address> {
    can_mutate(user, &state.addresses.find_by_id(&id)?)?;
    let fields = strip_fields(fields, PROTECTED_FIELDS);
    let address = state
        .addresses
        .update_if(&id, fields, |current| can_mutate(user, current))?;

    log_audit(
        Some(user.user_id),
        "address_update",
        Some("addresses"),
        Some(serde_json::json!({ "address_id": id })),
    );
    Ok(address)
}

pub async fn delete_address(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let address = state.addresses.find_by_id(&id)?;
    can_mutate(user, &address)?;
    state.addresses.remove(&id)?;

    log_audit(
        Some(user.user_id),
        "address_delete",
        Some("addresses"),
        Some(serde_json::json!({ "address_id": id })),
    );
    Ok(())
}

/// Only the owner may read or change an address.
pub(crate) fn can_mutate(user: &AuthUser, address: &Address) -> AppResult<()> {
    if address.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
