use serde::Deserialize;
use validator::Validate;

/// A card already tokenized by the payment provider's client SDK.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCardRequest {
    #[validate(length(min = 1))]
    pub payment_method_id: String,
}
