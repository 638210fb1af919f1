mod common;

use commerce_backend::{
    dto::auth::ChangePasswordRequest,
    error::AppError,
    field::{FieldValue, UpdateFields},
    middleware::auth::AuthUser,
    services::{address_service, category_service, payment_service, user_service},
};
use uuid::Uuid;

use common::{PASSWORD, address_request, create_category, create_product, create_user, setup};

#[tokio::test]
async fn registered_user_is_stored_without_password() -> anyhow::Result<()> {
    let app = setup();
    let (user, _) = create_user(&app, "a@b.com").await?;

    assert!(!user.id.is_nil());
    assert!(user.password.is_empty());
    assert_eq!(user.role, "user");
    assert!(!user.email_verified);

    let stored = app.state.users.find_by_id(&user.id)?;
    assert!(stored.password.starts_with("$argon2"));
    assert!(user_service::email_exists(&app.state, "A@B.com").await?);
    assert!(!user_service::email_exists(&app.state, "nobody@b.com").await?);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> anyhow::Result<()> {
    let app = setup();
    create_user(&app, "a@b.com").await?;

    let again = user_service::create_user(&app.state, common::register_request("a@b.com")).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    assert_eq!(app.state.users.find()?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = setup();
    let mut request = common::register_request("a@b.com");
    request.password = "short".into();

    let result = user_service::create_user(&app.state, request).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn registration_sends_verification_email() -> anyhow::Result<()> {
    let app = setup();
    create_user(&app, "a@b.com").await?;

    for _ in 0..50 {
        if !app.mailer.sent().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].template, "verify_email");
    Ok(())
}

#[tokio::test]
async fn credentials_are_checked() -> anyhow::Result<()> {
    let app = setup();
    create_user(&app, "a@b.com").await?;

    let user = user_service::get_by_credentials(&app.state, "a@b.com", PASSWORD).await?;
    assert!(user.password.is_empty());

    let wrong = user_service::get_by_credentials(&app.state, "a@b.com", "not-the-password").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

    let missing = user_service::get_by_credentials(&app.state, "x@b.com", PASSWORD).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn update_ignores_protected_fields() -> anyhow::Result<()> {
    let app = setup();
    let (user, auth) = create_user(&app, "a@b.com").await?;

    let mut fields = UpdateFields::new();
    fields.insert("first_name".into(), "Grace".into());
    fields.insert("role".into(), "admin".into());
    fields.insert("password".into(), "plain".into());
    let updated = user_service::update_user(&app.state, &auth, user.id, fields).await?;

    assert_eq!(updated.first_name, "Grace");
    assert_eq!(updated.role, "user");
    assert!(updated.updated_at > user.updated_at);
    let stored = app.state.users.find_by_id(&user.id)?;
    assert!(stored.password.starts_with("$argon2"));
    Ok(())
}

#[tokio::test]
async fn update_to_taken_email_is_a_conflict() -> anyhow::Result<()> {
    let app = setup();
    create_user(&app, "a@b.com").await?;
    let (other, auth) = create_user(&app, "c@d.com").await?;

    let mut fields = UpdateFields::new();
    fields.insert("email".into(), FieldValue::String(" A@B.com ".into()));
    let result = user_service::update_user(&app.state, &auth, other.id, fields).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn email_change_is_validated_and_needs_reverification() -> anyhow::Result<()> {
    let app = setup();
    let (user, auth) = create_user(&app, "a@b.com").await?;
    user_service::verify_email(&app.state, user.id).await?;

    let mut fields = UpdateFields::new();
    fields.insert("email".into(), "not-an-email".into());
    let invalid = user_service::update_user(&app.state, &auth, user.id, fields).await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));
    assert_eq!(app.state.users.find_by_id(&user.id)?.email, "a@b.com");

    let mut fields = UpdateFields::new();
    fields.insert("email".into(), "A@B.com".into());
    let same = user_service::update_user(&app.state, &auth, user.id, fields).await?;
    assert!(same.email_verified);

    let mut fields = UpdateFields::new();
    fields.insert("email".into(), "new@b.com".into());
    let moved = user_service::update_user(&app.state, &auth, user.id, fields).await?;
    assert_eq!(moved.email, "new@b.com");
    assert!(!moved.email_verified);
    Ok(())
}

#[tokio::test]
async fn users_cannot_update_each_other() -> anyhow::Result<()> {
    let app = setup();
    let (first, _) = create_user(&app, "a@b.com").await?;
    let (_, second) = create_user(&app, "c@d.com").await?;

    let mut fields = UpdateFields::new();
    fields.insert("first_name".into(), "Mallory".into());
    let result = user_service::update_user(&app.state, &second, first.id, fields).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
    assert_eq!(app.state.users.find_by_id(&first.id)?.first_name, "Ada");
    Ok(())
}

#[tokio::test]
async fn password_change_requires_current_password() -> anyhow::Result<()> {
    let app = setup();
    let (_, auth) = create_user(&app, "a@b.com").await?;

    let wrong = user_service::update_password(
        &app.state,
        &auth,
        ChangePasswordRequest {
            current_password: "guess".into(),
            new_password: "brand-new-secret".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

    user_service::update_password(
        &app.state,
        &auth,
        ChangePasswordRequest {
            current_password: PASSWORD.into(),
            new_password: "brand-new-secret".into(),
        },
    )
    .await?;
    user_service::get_by_credentials(&app.state, "a@b.com", "brand-new-secret").await?;
    Ok(())
}

#[tokio::test]
async fn deleting_user_removes_their_addresses_and_cards() -> anyhow::Result<()> {
    let app = setup();
    let (user, auth) = create_user(&app, "a@b.com").await?;
    address_service::create_address(&app.state, &auth, address_request("Home")).await?;
    common::create_card(&app, &auth).await?;
    let customer_id = app
        .state
        .users
        .find_by_id(&user.id)?
        .customer_id
        .expect("customer id");
    assert_eq!(payment_service::get_customer_cards(&app.state, &customer_id).await?.len(), 1);

    user_service::delete_user(&app.state, &auth, user.id).await?;
    assert!(app.state.addresses.find()?.is_empty());
    assert!(app.state.cards.find()?.is_empty());
    assert!(payment_service::get_customer_cards(&app.state, &customer_id).await?.is_empty());
    assert!(matches!(
        user_service::get_user(&app.state, user.id).await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn role_changes_need_an_admin() -> anyhow::Result<()> {
    let app = setup();
    let (user, auth) = create_user(&app, "a@b.com").await?;

    let denied = user_service::set_role(&app.state, &auth, user.id, "admin").await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let promoted = user_service::set_role(&app.state, &app.admin, user.id, "admin").await?;
    assert!(promoted.is_admin());

    let invalid = user_service::set_role(&app.state, &app.admin, user.id, "root").await;
    assert!(matches!(invalid, Err(AppError::TypeMismatch { .. })));
    Ok(())
}

#[tokio::test]
async fn address_for_missing_user_is_rejected() {
    let app = setup();
    let ghost = AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    };

    let result = address_service::create_address(&app.state, &ghost, address_request("Home")).await;
    assert!(matches!(result, Err(AppError::OwnerNotFound)));
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() -> anyhow::Result<()> {
    let app = setup();
    let clothes = create_category(&app, "clothes").await?;
    let shirt = create_product(&app, &clothes, "Shirt", 2500, 0).await?;

    let result = category_service::delete_category(&app.state, &app.admin, clothes.id).await;
    assert!(matches!(result, Err(AppError::InUse(_))));
    assert!(app.state.categories.exists(&clothes.id));

    app.state.products.remove(&shirt.id)?;
    category_service::delete_category(&app.state, &app.admin, clothes.id).await?;
    assert!(!app.state.categories.exists(&clothes.id));
    Ok(())
}

#[tokio::test]
async fn category_names_are_unique() -> anyhow::Result<()> {
    let app = setup();
    create_category(&app, "clothes").await?;

    let again = create_category(&app, "clothes").await;
    let err = again.expect_err("duplicate category");
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn signup_address_and_catalog_scenario() -> anyhow::Result<()> {
    let app = setup();

    let user = user_service::create_user(&app.state, common::register_request("a@b.com")).await?;
    assert!(!user.id.is_nil());
    assert!(user.password.is_empty());

    let again = user_service::create_user(&app.state, common::register_request("a@b.com")).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let ghost = AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    };
    let orphan = address_service::create_address(&app.state, &ghost, address_request("Home")).await;
    assert!(matches!(orphan, Err(AppError::OwnerNotFound)));

    let clothes = create_category(&app, "clothes").await?;
    create_product(&app, &clothes, "Scarf", 1500, 10).await?;
    let delete = category_service::delete_category(&app.state, &app.admin, clothes.id).await;
    assert!(matches!(delete, Err(AppError::InUse(_))));
    Ok(())
}
