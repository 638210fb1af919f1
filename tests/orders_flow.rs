mod common;

use std::time::Duration;

use commerce_backend::{
    dto::orders::{OrderLineRequest, PlaceOrderRequest},
    entity::{Order, OrderStatus},
    error::AppError,
    field::UpdateFields,
    services::{order_service, product_service},
};
use uuid::Uuid;

use common::{TestApp, create_address, create_card, create_category, create_product, create_user, setup};

fn line(product_id: Uuid, quantity: i64) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        quantity,
    }
}

/// Poll until the reconciler has moved the order out of `pending`.
async fn settled(app: &TestApp, order_id: Uuid) -> anyhow::Result<Order> {
    for _ in 0..100 {
        let order = app.state.orders.find_by_id(&order_id)?;
        if order.status != OrderStatus::Created {
            return Ok(order);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(app.state.orders.find_by_id(&order_id)?)
}

#[tokio::test]
async fn totals_apply_discounts_per_line() -> anyhow::Result<()> {
    let app = setup();
    let category = create_category(&app, "gadgets").await?;
    let a = create_product(&app, &category, "A", 2064, 0).await?;
    let b = create_product(&app, &category, "B", 6000, 9).await?;

    let quote = order_service::compute_total(&app.state, &[line(a.id, 3)]).await?;
    assert_eq!(quote.total, 6192);

    let quote = order_service::compute_total(&app.state, &[line(a.id, 4), line(b.id, 7)]).await?;
    assert_eq!(quote.total, 46476);
    assert_eq!(quote.lines[1].unit_price, 5460);
    assert_eq!(product_service::discounted_unit_price(&app.state, b.id).await?, 5460);
    Ok(())
}

#[tokio::test]
async fn unknown_or_unavailable_products_are_invalid() -> anyhow::Result<()> {
    let app = setup();
    let category = create_category(&app, "gadgets").await?;
    let a = create_product(&app, &category, "A", 1000, 0).await?;

    let missing = Uuid::new_v4();
    let result = order_service::compute_total(&app.state, &[line(missing, 1)]).await;
    assert!(matches!(result, Err(AppError::InvalidProduct(id)) if id == missing));

    let result = order_service::compute_total(&app.state, &[line(a.id, 101)]).await;
    assert!(matches!(result, Err(AppError::InvalidProduct(_))));

    let mut fields = UpdateFields::new();
    fields.insert("available".into(), false.into());
    product_service::update_product(&app.state, &app.admin, a.id, fields).await?;
    let result = order_service::compute_total(&app.state, &[line(a.id, 1)]).await;
    assert!(matches!(result, Err(AppError::InvalidProduct(_))));

    let result = order_service::compute_total(&app.state, &[]).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn huge_prices_are_rejected_instead_of_overflowing() -> anyhow::Result<()> {
    let app = setup();
    let category = create_category(&app, "yachts").await?;
    let big = create_product(&app, &category, "Big", 100_000_000_000_000_000, 0).await?;
    let huge = create_product(&app, &category, "Huge", 5_000_000_000_000_000_000, 0).await?;

    let quote = order_service::compute_total(&app.state, &[line(big.id, 1)]).await?;
    assert_eq!(quote.total, 100_000_000_000_000_000);

    let result = order_service::compute_total(&app.state, &[line(huge.id, 2)]).await;
    assert!(matches!(result, Err(AppError::InvalidProduct(id)) if id == huge.id));

    let result = order_service::compute_total(&app.state, &[line(huge.id, 1), line(huge.id, 1)]).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn paid_order_is_reconciled_in_background() -> anyhow::Result<()> {
    let app = setup();
    let (_, buyer) = create_user(&app, "buyer@example.com").await?;
    let category = create_category(&app, "gadgets").await?;
    let a = create_product(&app, &category, "A", 2064, 0).await?;
    let address = create_address(&app, &buyer).await?;
    let card = create_card(&app, &buyer).await?;

    let order = order_service::place_order(
        &app.state,
        &buyer,
        PlaceOrderRequest {
            address_id: address.id,
            card_id: card.id,
            products: vec![line(a.id, 3)],
        },
    )
    .await?;
    assert_eq!(order.amount, 6192);
    assert_eq!(order.currency, "usd");

    let order = settled(&app, order.id).await?;
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.is_paid());

    let charges = app.payments.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, 6192);
    assert_eq!(order.payment_id.as_deref(), Some(charges[0].id.as_str()));

    let fulfilled = order_service::fulfill_order(&app.state, &app.admin, order.id).await?;
    assert_eq!(fulfilled.status, OrderStatus::Fulfilled);
    Ok(())
}

#[tokio::test]
async fn declined_payment_keeps_the_order_unpaid() -> anyhow::Result<()> {
    let app = setup();
    let (_, buyer) = create_user(&app, "buyer@example.com").await?;
    let category = create_category(&app, "gadgets").await?;
    let a = create_product(&app, &category, "A", 2064, 0).await?;
    let address = create_address(&app, &buyer).await?;
    let card = create_card(&app, &buyer).await?;
    app.payments.set_decline(true);

    let result = order_service::place_order(
        &app.state,
        &buyer,
        PlaceOrderRequest {
            address_id: address.id,
            card_id: card.id,
            products: vec![line(a.id, 3)],
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Upstream(_))));

    let orders = order_service::list_orders(&app.state, &buyer, None).await?;
    assert_eq!(orders.len(), 1);
    let order = settled(&app, orders[0].id).await?;
    assert_eq!(order.status, OrderStatus::PaymentFailed);
    assert!(!order.is_paid());
    assert!(order.payment_id.is_none());
    assert!(app.payments.charges().is_empty());

    let not_paid = order_service::fulfill_order(&app.state, &app.admin, order.id).await;
    assert!(matches!(not_paid, Err(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn foreign_address_is_rejected_before_anything_is_stored() -> anyhow::Result<()> {
    let app = setup();
    let (_, buyer) = create_user(&app, "buyer@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let category = create_category(&app, "gadgets").await?;
    let a = create_product(&app, &category, "A", 1000, 0).await?;
    let foreign_address = create_address(&app, &other).await?;
    let card = create_card(&app, &buyer).await?;

    let result = order_service::place_order(
        &app.state,
        &buyer,
        PlaceOrderRequest {
            address_id: foreign_address.id,
            card_id: card.id,
            products: vec![line(a.id, 1)],
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidAddress)));
    assert!(app.state.orders.find()?.is_empty());
    assert!(app.payments.charges().is_empty());
    Ok(())
}

#[tokio::test]
async fn orders_are_private_to_their_buyer() -> anyhow::Result<()> {
    let app = setup();
    let (_, buyer) = create_user(&app, "buyer@example.com").await?;
    let (_, other) = create_user(&app, "other@example.com").await?;
    let category = create_category(&app, "gadgets").await?;
    let a = create_product(&app, &category, "A", 1000, 0).await?;
    let address = create_address(&app, &buyer).await?;
    let card = create_card(&app, &buyer).await?;

    let order = order_service::place_order(
        &app.state,
        &buyer,
        PlaceOrderRequest {
            address_id: address.id,
            card_id: card.id,
            products: vec![line(a.id, 2)],
        },
    )
    .await?;

    let denied = order_service::get_order(&app.state, &other, order.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    assert!(order_service::list_orders(&app.state, &other, None).await?.is_empty());
    assert_eq!(order_service::get_order(&app.state, &buyer, order.id).await?.id, order.id);
    Ok(())
}
