use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::log_audit,
    dto::cards::CreateCardRequest,
    entity::Card,
    error::{AppError, AppResult},
    field::UpdateFields,
    middleware::auth::AuthUser,
    services::payment_service,
    state::AppState,
};

/// Card details belong to the provider; only the expiry may be edited here.
const UPDATABLE_FIELDS: &[&str] = &["exp_month", "exp_year"];

pub async fn create_card(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCardRequest,
) -> AppResult<Card> {
    payload.validate()?;
    if !state.users.exists(&user.user_id) {
        return Err(AppError::OwnerNotFound);
    }

    let customer_id = payment_service::get_or_create_customer_id(state, user.user_id).await?;
    let method =
        payment_service::attach_card_to_customer(state, &customer_id, &payload.payment_method_id)
            .await?;

    let now = Utc::now();
    let card = Card {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        payment_method_id: method.id,
        brand: method.brand,
        last4: method.last4,
        exp_month: method.exp_month,
        exp_year: method.exp_year,
        created_at: now,
        updated_at: now,
    };
    state.cards.save(&card)?;

    log_audit(
        Some(user.user_id),
        "card_create",
        Some("cards"),
        Some(serde_json::json!({ "card_id": card.id })),
    );
    Ok(card)
}

pub async fn get_card(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Card> {
    let card = state.cards.find_by_id(&id)?;
    can_mutate(user, &card)?;
    Ok(card)
}

pub async fn list_cards(state: &AppState, user: &AuthUser) -> AppResult<Vec<Card>> {
    let mut cards = state.cards.find_where("user_id", "==", user.user_id)?;
    cards.sort_by_key(|c| c.created_at);
    Ok(cards)
}

pub async fn update_card(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    mut fields: UpdateFields,
) -> AppResult<Card> {
    can_mutate(user, &state.cards.find_by_id(&id)?)?;
    fields.retain(|name, _| UPDATABLE_FIELDS.contains(&name.as_str()));
    if let Some(month) = fields.get("exp_month").and_then(|v| v.as_integer()) {
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest("exp_month must be between 1 and 12".into()));
        }
    }
    let card = state
        .cards
        .update_if(&id, fields, |current| can_mutate(user, current))?;

    log_audit(
        Some(user.user_id),
        "card_update",
        Some("cards"),
        Some(serde_json::json!({ "card_id": id })),
    );
    Ok(card)
}

pub async fn delete_card(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let card = state.cards.find_by_id(&id)?;
    can_mutate(user, &card)?;
    forget_card(state, &card).await?;

    log_audit(
        Some(user.user_id),
        "card_delete",
        Some("cards"),
        Some(serde_json::json!({ "card_id": id })),
    );
    Ok(())
}

/// Detach the payment method upstream, then remove the card.
pub(crate) async fn forget_card(state: &AppState, card: &Card) -> AppResult<()> {
    payment_service::detach_card_from_customer(state, &card.payment_method_id).await?;
    state.cards.remove(&card.id)
}

pub(crate) fn can_mutate(user: &AuthUser, card: &Card) -> AppResult<()> {
    if card.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
