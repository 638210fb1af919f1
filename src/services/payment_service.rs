use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::AppResult,
    field::UpdateFields,
    payment::{Charge, ChargeRequest, PaymentError, PaymentMethod},
    state::AppState,
};

/// The user's payment-provider customer reference, created upstream on first
/// use and stored on the user. Concurrent callers share one creation.
#[instrument(skip(state))]
pub async fn get_or_create_customer_id(state: &AppState, user_id: Uuid) -> AppResult<String> {
    let _guard = state.identity_lock.lock().await;
    let user = state.users.find_by_id(&user_id)?;
    if let Some(customer_id) = user.customer_id {
        return Ok(customer_id);
    }

    let customer_id = state.payments.create_customer(&user.email).await?;
    let mut fields = UpdateFields::new();
    fields.insert("customer_id".to_string(), customer_id.as_str().into());
    state.users.update(&user_id, fields)?;

    info!(%user_id, %customer_id, "payment customer created");
    Ok(customer_id)
}

pub async fn attach_card_to_customer(
    state: &AppState,
    customer_id: &str,
    payment_method_id: &str,
) -> AppResult<PaymentMethod> {
    Ok(state
        .payments
        .attach_payment_method(customer_id, payment_method_id)
        .await?)
}

/// Detach a payment method upstream. A method the provider no longer knows
/// counts as detached.
pub async fn detach_card_from_customer(state: &AppState, payment_method_id: &str) -> AppResult<()> {
    match state.payments.detach_payment_method(payment_method_id).await {
        Ok(()) => Ok(()),
        Err(PaymentError::UnknownPaymentMethod(_)) => {
            warn!(%payment_method_id, "payment method already gone upstream");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn get_customer_cards(state: &AppState, customer_id: &str) -> AppResult<Vec<PaymentMethod>> {
    Ok(state.payments.list_payment_methods(customer_id).await?)
}

/// Capture `amount` (minor units, configured currency) in a single provider
/// call. Provider errors come back as `Upstream` unchanged.
pub async fn make_payment(
    state: &AppState,
    customer_id: &str,
    payment_method_id: &str,
    amount: i64,
) -> AppResult<Charge> {
    let request = ChargeRequest {
        customer_id: customer_id.to_string(),
        payment_method_id: payment_method_id.to_string(),
        amount,
        currency: state.config.payment.currency.clone(),
        description: None,
    };
    Ok(state.payments.create_charge(request).await?)
}
