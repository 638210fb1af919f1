//! Payment provider seam
//!
//! The core never speaks a provider's wire protocol; it talks to a
//! [`PaymentProvider`] and treats every failure as upstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

pub mod in_memory;

pub use in_memory::InMemoryPaymentProvider;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaymentError {
    #[error("no such customer: {0}")]
    UnknownCustomer(String),

    #[error("no such payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("payment method {payment_method} does not belong to customer {customer}")]
    NotCustomersPaymentMethod {
        customer: String,
        payment_method: String,
    },

    #[error("card declined: {0}")]
    Declined(String),

    #[error("invalid amount {0}")]
    InvalidAmount(i64),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub customer_id: Option<String>,
    pub brand: String,
    pub last4: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub customer_id: String,
    pub payment_method_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer record upstream and return its reference.
    async fn create_customer(&self, email: &str) -> Result<String, PaymentError>;

    /// Attach a payment method to a customer and return its details.
    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, PaymentError>;

    async fn detach_payment_method(&self, payment_method_id: &str) -> Result<(), PaymentError>;

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> Result<Vec<PaymentMethod>, PaymentError>;

    /// Capture a charge. One call, no retry.
    async fn create_charge(&self, request: ChargeRequest) -> Result<Charge, PaymentError>;
}
