use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::log_audit,
    dto::orders::{OrderLineRequest, PlaceOrderRequest},
    entity::{Order, OrderProduct, OrderStatus},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    services::{
        payment_service,
        reconciler::{self, StatusUpdate},
    },
    state::AppState,
};

/// Priced order lines and their sum, in minor currency units.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuote {
    pub lines: Vec<OrderProduct>,
    pub total: i64,
}

/// Price every line at its discounted unit price.
pub async fn compute_total(state: &AppState, lines: &[OrderLineRequest]) -> AppResult<OrderQuote> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("Order has no products".into()));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut total: i64 = 0;
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity {} for product {}",
                line.quantity, line.product_id
            )));
        }
        let product = match state.products.find_by_id(&line.product_id) {
            Ok(product) => product,
            Err(AppError::NotFound(_)) => return Err(AppError::InvalidProduct(line.product_id)),
            Err(err) => return Err(err),
        };
        if !product.can_fulfil(line.quantity) {
            return Err(AppError::InvalidProduct(line.product_id));
        }

        let (Some(line_total), Some(unit_price)) =
            (product.line_total(line.quantity), product.discounted_price())
        else {
            return Err(AppError::InvalidProduct(line.product_id));
        };
        total = total
            .checked_add(line_total)
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
        priced.push(OrderProduct {
            product_id: product.id,
            quantity: line.quantity,
            unit_price,
        });
    }

    Ok(OrderQuote {
        lines: priced,
        total,
    })
}

/// Price, persist, then charge.
///
/// The order is stored as pending before the provider is called. The
/// resulting status change is handed to the reconciler and lands after
/// this returns, so the returned order still reads pending.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<Order> {
    payload.validate()?;
    let quote = compute_total(state, &payload.products).await?;

    let address = match state.addresses.find_by_id(&payload.address_id) {
        Ok(address) => address,
        Err(AppError::NotFound(_)) => return Err(AppError::InvalidAddress),
        Err(err) => return Err(err),
    };
    if address.user_id != user.user_id {
        return Err(AppError::InvalidAddress);
    }
    let card = state.cards.find_by_id(&payload.card_id)?;
    if card.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        address_id: address.id,
        card_id: card.id,
        products: quote.lines,
        amount: quote.total,
        currency: state.config.payment.currency.clone(),
        payment_id: None,
        status: OrderStatus::Created,
        created_at: now,
        updated_at: now,
    };
    state.orders.save(&order)?;

    let charge = async {
        let customer_id = payment_service::get_or_create_customer_id(state, user.user_id).await?;
        payment_service::make_payment(state, &customer_id, &card.payment_method_id, order.amount)
            .await
    }
    .await;

    match charge {
        Ok(charge) => {
            info!(order_id = %order.id, charge_id = %charge.id, amount = order.amount, "order charged");
            state.reconciler.enqueue(StatusUpdate {
                order_id: order.id,
                status: OrderStatus::Paid,
                payment_id: Some(charge.id.clone()),
            });
            log_audit(
                Some(user.user_id),
                "order_place",
                Some("orders"),
                Some(serde_json::json!({ "order_id": order.id, "charge_id": charge.id })),
            );
            Ok(order)
        }
        Err(err) => {
            warn!(order_id = %order.id, error = %err, "order payment failed");
            state.reconciler.enqueue(StatusUpdate {
                order_id: order.id,
                status: OrderStatus::PaymentFailed,
                payment_id: None,
            });
            Err(err)
        }
    }
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Order> {
    let order = state.orders.find_by_id(&id)?;
    if order.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(order)
}

/// The caller's orders, newest first, optionally narrowed to one status.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    status: Option<OrderStatus>,
) -> AppResult<Vec<Order>> {
    let mut orders = match status {
        Some(status) => state
            .orders
            .find_where("status", "==", status)?
            .into_iter()
            .filter(|order| order.user_id == user.user_id)
            .collect(),
        None => state.orders.find_where("user_id", "==", user.user_id)?,
    };
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
}

/// Mark a paid order as delivered.
pub async fn fulfill_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Order> {
    ensure_admin(user)?;
    let order = reconciler::apply(
        &state.orders,
        &StatusUpdate {
            order_id: id,
            status: OrderStatus::Fulfilled,
            payment_id: None,
        },
    )?;

    log_audit(
        Some(user.user_id),
        "order_fulfill",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    );
    Ok(order)
}
