pub mod address_service;
pub mod auth_service;
pub mod card_service;
pub mod category_service;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod reconciler;
pub mod user_service;

use crate::field::UpdateFields;

/// Drop keys a caller may never write: identifiers, owner references and
/// audit timestamps.
pub(crate) fn strip_fields(mut fields: UpdateFields, protected: &[&str]) -> UpdateFields {
    fields.retain(|name, _| {
        let keep = !protected.contains(&name.as_str());
        if !keep {
            tracing::debug!(field = %name, "ignoring protected field in update");
        }
        keep
    });
    fields
}
