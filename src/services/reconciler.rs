//! Background worker that records order status changes after payment.
//!
//! The order workflow answers the client as soon as the charge call
//! returns; the resulting status change is queued here and applied off the
//! request path. Failed updates are logged, counted and the most recent
//! [`DEAD_LETTER_CAPACITY`] are kept as dead letters.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    entity::{Order, OrderStatus},
    error::{AppError, AppResult},
    field::UpdateFields,
    repository::Repository,
};

/// Dead letters kept for inspection; older ones are dropped first.
pub const DEAD_LETTER_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FailedUpdate {
    pub update: StatusUpdate,
    pub error: String,
}

#[derive(Default)]
struct Counters {
    applied: AtomicU64,
    failed: AtomicU64,
}

/// Handle to the reconciliation worker. Cloning shares the same queue.
#[derive(Clone)]
pub struct OrderReconciler {
    sender: mpsc::UnboundedSender<StatusUpdate>,
    counters: Arc<Counters>,
    dead_letters: Arc<Mutex<VecDeque<FailedUpdate>>>,
}

impl OrderReconciler {
    /// Start the worker on the current tokio runtime. It stops once every
    /// handle has been dropped and the queue is drained.
    pub fn spawn(orders: Repository<Order>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let dead_letters = Arc::new(Mutex::new(VecDeque::new()));

        tokio::spawn(run(
            orders,
            receiver,
            Arc::clone(&counters),
            Arc::clone(&dead_letters),
        ));

        Self {
            sender,
            counters,
            dead_letters,
        }
    }

    /// Queue an update. Never blocks and never fails the caller.
    pub fn enqueue(&self, update: StatusUpdate) {
        debug!(order_id = %update.order_id, status = %update.status, "queued status update");
        if let Err(mpsc::error::SendError(update)) = self.sender.send(update) {
            error!(order_id = %update.order_id, "reconciler is not running, update dropped");
            record_failure(
                &self.counters,
                &self.dead_letters,
                update,
                "reconciler is not running".to_string(),
            );
        }
    }

    pub fn applied(&self) -> u64 {
        self.counters.applied.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::SeqCst)
    }

    pub fn dead_letters(&self) -> Vec<FailedUpdate> {
        self.dead_letters
            .lock()
            .map(|letters| letters.iter().cloned().collect())
            .unwrap_or_default()
    }
}

async fn run(
    orders: Repository<Order>,
    mut receiver: mpsc::UnboundedReceiver<StatusUpdate>,
    counters: Arc<Counters>,
    dead_letters: Arc<Mutex<VecDeque<FailedUpdate>>>,
) {
    while let Some(update) = receiver.recv().await {
        match apply(&orders, &update) {
            Ok(order) => {
                counters.applied.fetch_add(1, Ordering::SeqCst);
                info!(order_id = %order.id, status = %order.status, "order status updated");
            }
            Err(err) => {
                error!(
                    order_id = %update.order_id,
                    status = %update.status,
                    error = %err,
                    "order status update failed"
                );
                record_failure(&counters, &dead_letters, update, err.to_string());
            }
        }
    }
    debug!("order reconciler stopped");
}

fn record_failure(
    counters: &Counters,
    dead_letters: &Mutex<VecDeque<FailedUpdate>>,
    update: StatusUpdate,
    error: String,
) {
    counters.failed.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut letters) = dead_letters.lock() {
        if letters.len() == DEAD_LETTER_CAPACITY {
            letters.pop_front();
        }
        letters.push_back(FailedUpdate { update, error });
    }
}

/// Apply one update through the field-checked repository path, refusing
/// transitions the order lifecycle does not allow.
pub(crate) fn apply(orders: &Repository<Order>, update: &StatusUpdate) -> AppResult<Order> {
    let mut fields = UpdateFields::new();
    fields.insert("status".to_string(), update.status.into());
    if let Some(payment_id) = &update.payment_id {
        fields.insert("payment_id".to_string(), payment_id.clone().into());
    }

    orders.update_if(&update.order_id, fields, |order| {
        if order.status.can_transition_to(update.status) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Order {} cannot move from {} to {}",
                order.id, order.status, update.status
            )))
        }
    })
}
