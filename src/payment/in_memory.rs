//! In-memory payment provider for development and tests

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Charge, ChargeRequest, PaymentError, PaymentMethod, PaymentProvider};

#[derive(Default)]
struct Ledger {
    customers: HashMap<String, String>,
    methods: HashMap<String, PaymentMethod>,
    charges: Vec<Charge>,
}

/// Provider that keeps customers, payment methods and charges in memory.
///
/// Mirrors the checks a real provider makes (unknown references, method
/// ownership) and can be switched to decline every charge.
#[derive(Clone, Default)]
pub struct InMemoryPaymentProvider {
    ledger: Arc<Mutex<Ledger>>,
    customer_creations: Arc<AtomicUsize>,
    decline: Arc<AtomicBool>,
}

impl InMemoryPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize a card the way a client-side SDK would. The returned
    /// payment method is not attached to any customer yet.
    pub fn register_payment_method(
        &self,
        brand: &str,
        last4: &str,
        exp_month: i64,
        exp_year: i64,
    ) -> String {
        let id = format!("pm_{}", Uuid::new_v4().simple());
        let method = PaymentMethod {
            id: id.clone(),
            customer_id: None,
            brand: brand.to_string(),
            last4: last4.to_string(),
            exp_month,
            exp_year,
        };
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.methods.insert(id.clone(), method);
        }
        id
    }

    pub fn set_decline(&self, decline: bool) {
        self.decline.store(decline, Ordering::SeqCst);
    }

    pub fn customer_creations(&self) -> usize {
        self.customer_creations.load(Ordering::SeqCst)
    }

    pub fn charges(&self) -> Vec<Charge> {
        self.ledger
            .lock()
            .map(|ledger| ledger.charges.clone())
            .unwrap_or_default()
    }

    fn with_ledger<R>(
        &self,
        f: impl FnOnce(&mut Ledger) -> Result<R, PaymentError>,
    ) -> Result<R, PaymentError> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|e| PaymentError::Unavailable(format!("ledger lock poisoned: {e}")))?;
        f(&mut ledger)
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    async fn create_customer(&self, email: &str) -> Result<String, PaymentError> {
        let id = format!("cus_{}", Uuid::new_v4().simple());
        self.with_ledger(|ledger| {
            ledger.customers.insert(id.clone(), email.to_string());
            Ok(())
        })?;
        self.customer_creations.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, PaymentError> {
        self.with_ledger(|ledger| {
            if !ledger.customers.contains_key(customer_id) {
                return Err(PaymentError::UnknownCustomer(customer_id.to_string()));
            }
            let method = ledger
                .methods
                .get_mut(payment_method_id)
                .ok_or_else(|| PaymentError::UnknownPaymentMethod(payment_method_id.to_string()))?;
            method.customer_id = Some(customer_id.to_string());
            Ok(method.clone())
        })
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> Result<(), PaymentError> {
        self.with_ledger(|ledger| {
            let method = ledger
                .methods
                .get_mut(payment_method_id)
                .ok_or_else(|| PaymentError::UnknownPaymentMethod(payment_method_id.to_string()))?;
            method.customer_id = None;
            Ok(())
        })
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> Result<Vec<PaymentMethod>, PaymentError> {
        self.with_ledger(|ledger| {
            if !ledger.customers.contains_key(customer_id) {
                return Err(PaymentError::UnknownCustomer(customer_id.to_string()));
            }
            Ok(ledger
                .methods
                .values()
                .filter(|m| m.customer_id.as_deref() == Some(customer_id))
                .cloned()
                .collect())
        })
    }

    async fn create_charge(&self, request: ChargeRequest) -> Result<Charge, PaymentError> {
        let decline = self.decline.load(Ordering::SeqCst);
        self.with_ledger(|ledger| {
            if request.amount <= 0 {
                return Err(PaymentError::InvalidAmount(request.amount));
            }
            if !ledger.customers.contains_key(&request.customer_id) {
                return Err(PaymentError::UnknownCustomer(request.customer_id.clone()));
            }
            let method = ledger
                .methods
                .get(&request.payment_method_id)
                .ok_or_else(|| {
                    PaymentError::UnknownPaymentMethod(request.payment_method_id.clone())
                })?;
            if method.customer_id.as_deref() != Some(request.customer_id.as_str()) {
                return Err(PaymentError::NotCustomersPaymentMethod {
                    customer: request.customer_id.clone(),
                    payment_method: request.payment_method_id.clone(),
                });
            }
            if decline {
                return Err(PaymentError::Declined("insufficient_funds".to_string()));
            }

            let charge = Charge {
                id: format!("ch_{}", Uuid::new_v4().simple()),
                amount: request.amount,
                currency: request.currency.clone(),
            };
            ledger.charges.push(charge.clone());
            Ok(charge)
        })
    }
}
