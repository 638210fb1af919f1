use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    email::EmailSender,
    entity::{Address, Card, Category, Order, Product, User},
    payment::PaymentProvider,
    repository::Repository,
    services::reconciler::OrderReconciler,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Repository<User>,
    pub categories: Repository<Category>,
    pub products: Repository<Product>,
    pub addresses: Repository<Address>,
    pub cards: Repository<Card>,
    pub orders: Repository<Order>,
    pub payments: Arc<dyn PaymentProvider>,
    pub mailer: Arc<dyn EmailSender>,
    pub reconciler: OrderReconciler,
    /// Serializes category deletion against product writes that reference
    /// a category.
    pub catalog_lock: Arc<Mutex<()>>,
    /// Serializes the email-uniqueness check with user writes.
    pub identity_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Build the state and start the order reconciler. Must run inside a
    /// tokio runtime.
    pub fn new(
        config: AppConfig,
        payments: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        let orders = Repository::new();
        let reconciler = OrderReconciler::spawn(orders.clone());

        Self {
            config: Arc::new(config),
            users: Repository::new(),
            categories: Repository::new(),
            products: Repository::new(),
            addresses: Repository::new(),
            cards: Repository::new(),
            orders,
            payments,
            mailer,
            reconciler,
            catalog_lock: Arc::new(Mutex::new(())),
            identity_lock: Arc::new(Mutex::new(())),
        }
    }
}
