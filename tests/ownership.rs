mod common;

use commerce_backend::{
    error::AppError,
    field::UpdateFields,
    services::{address_service, card_service},
};

use common::{create_address, create_card, create_user, setup};

#[tokio::test]
async fn only_the_owner_can_change_an_address() -> anyhow::Result<()> {
    let app = setup();
    let (_, owner) = create_user(&app, "owner@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let address = create_address(&app, &owner).await?;

    let mut fields = UpdateFields::new();
    fields.insert("city".into(), "Shelbyville".into());

    let denied = address_service::update_address(&app.state, &other, address.id, fields.clone()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    assert_eq!(app.state.addresses.find_by_id(&address.id)?, address);

    let denied = address_service::delete_address(&app.state, &other, address.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    assert!(app.state.addresses.exists(&address.id));

    let denied = address_service::get_address(&app.state, &other, address.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let updated = address_service::update_address(&app.state, &owner, address.id, fields).await?;
    assert_eq!(updated.city, "Shelbyville");
    Ok(())
}

#[tokio::test]
async fn address_owner_cannot_be_reassigned() -> anyhow::Result<()> {
    let app = setup();
    let (_, owner) = create_user(&app, "owner@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let address = create_address(&app, &owner).await?;

    let mut fields = UpdateFields::new();
    fields.insert("user_id".into(), other.user_id.into());
    fields.insert("title".into(), "Work".into());
    let updated = address_service::update_address(&app.state, &owner, address.id, fields).await?;

    assert_eq!(updated.user_id, owner.user_id);
    assert_eq!(updated.title, "Work");
    Ok(())
}

#[tokio::test]
async fn addresses_are_listed_per_owner() -> anyhow::Result<()> {
    let app = setup();
    let (_, owner) = create_user(&app, "owner@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    create_address(&app, &owner).await?;
    create_address(&app, &owner).await?;
    create_address(&app, &other).await?;

    assert_eq!(address_service::list_addresses(&app.state, &owner).await?.len(), 2);
    assert_eq!(address_service::list_addresses(&app.state, &other).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn only_the_owner_can_remove_a_card() -> anyhow::Result<()> {
    let app = setup();
    let (_, owner) = create_user(&app, "owner@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let card = create_card(&app, &owner).await?;

    let denied = card_service::delete_card(&app.state, &other, card.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    assert_eq!(app.state.cards.find_by_id(&card.id)?, card);

    card_service::delete_card(&app.state, &owner, card.id).await?;
    assert!(!app.state.cards.exists(&card.id));
    Ok(())
}

#[tokio::test]
async fn card_updates_touch_only_the_expiry() -> anyhow::Result<()> {
    let app = setup();
    let (_, owner) = create_user(&app, "owner@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let card = create_card(&app, &owner).await?;

    let mut fields = UpdateFields::new();
    fields.insert("exp_year".into(), 2031_i64.into());
    fields.insert("last4".into(), "0000".into());

    let denied = card_service::update_card(&app.state, &other, card.id, fields.clone()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let updated = card_service::update_card(&app.state, &owner, card.id, fields).await?;
    assert_eq!(updated.exp_year, 2031);
    assert_eq!(updated.last4, "4242");

    let mut bad_month = UpdateFields::new();
    bad_month.insert("exp_month".into(), 13_i64.into());
    let rejected = card_service::update_card(&app.state, &owner, card.id, bad_month).await;
    assert!(matches!(rejected, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn non_owner_is_forbidden_even_with_only_protected_keys() -> anyhow::Result<()> {
    let app = setup();
    let (_, owner) = create_user(&app, "owner@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let address = create_address(&app, &owner).await?;
    let card = create_card(&app, &owner).await?;

    let mut fields = UpdateFields::new();
    fields.insert("user_id".into(), other.user_id.into());
    let denied = address_service::update_address(&app.state, &other, address.id, fields).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let mut fields = UpdateFields::new();
    fields.insert("last4".into(), "0000".into());
    let denied = card_service::update_card(&app.state, &other, card.id, fields).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // The owner sending nothing writable is a bad request, not a no-op.
    let mut fields = UpdateFields::new();
    fields.insert("last4".into(), "0000".into());
    let empty = card_service::update_card(&app.state, &owner, card.id, fields).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));
    Ok(())
}
