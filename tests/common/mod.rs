#![allow(dead_code)]

use std::sync::Arc;

use commerce_backend::{
    config::AppConfig,
    dto::{
        addresses::CreateAddressRequest,
        auth::RegisterRequest,
        cards::CreateCardRequest,
        products::{CreateCategoryRequest, CreateProductRequest},
    },
    email::LogMailer,
    entity::{Address, Card, Category, Product, User},
    middleware::auth::AuthUser,
    payment::InMemoryPaymentProvider,
    services::{address_service, card_service, category_service, product_service, user_service},
    state::AppState,
    telemetry,
};
use uuid::Uuid;

pub const PASSWORD: &str = "longenough123";

pub struct TestApp {
    pub state: AppState,
    pub payments: InMemoryPaymentProvider,
    pub mailer: LogMailer,
    pub admin: AuthUser,
}

pub fn setup() -> TestApp {
    telemetry::init_tracing("warn");
    let payments = InMemoryPaymentProvider::new();
    let mailer = LogMailer::new();
    let state = AppState::new(
        AppConfig::with_secret("test-secret"),
        Arc::new(payments.clone()),
        Arc::new(mailer.clone()),
    );
    TestApp {
        state,
        payments,
        mailer,
        admin: AuthUser {
            user_id: Uuid::new_v4(),
            role: "admin".into(),
        },
    }
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        password: PASSWORD.into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        phone: None,
    }
}

pub async fn create_user(app: &TestApp, email: &str) -> anyhow::Result<(User, AuthUser)> {
    let user = user_service::create_user(&app.state, register_request(email)).await?;
    let auth = AuthUser {
        user_id: user.id,
        role: user.role.clone(),
    };
    Ok((user, auth))
}

pub async fn create_category(app: &TestApp, name: &str) -> anyhow::Result<Category> {
    Ok(category_service::create_category(
        &app.state,
        &app.admin,
        CreateCategoryRequest {
            name: name.into(),
            description: None,
        },
    )
    .await?)
}

pub async fn create_product(
    app: &TestApp,
    category: &Category,
    name: &str,
    price: i64,
    discount_rate: i64,
) -> anyhow::Result<Product> {
    Ok(product_service::create_product(
        &app.state,
        &app.admin,
        CreateProductRequest {
            name: name.into(),
            description: None,
            price,
            discount_rate,
            stock: 100,
            available: true,
            category_id: category.id,
        },
    )
    .await?)
}

pub fn address_request(title: &str) -> CreateAddressRequest {
    CreateAddressRequest {
        title: title.into(),
        line1: "1 Main Street".into(),
        line2: None,
        city: "Springfield".into(),
        postal_code: "12345".into(),
        country: "US".into(),
        phone: None,
    }
}

pub async fn create_address(app: &TestApp, user: &AuthUser) -> anyhow::Result<Address> {
    Ok(address_service::create_address(&app.state, user, address_request("Home")).await?)
}

pub async fn create_card(app: &TestApp, user: &AuthUser) -> anyhow::Result<Card> {
    let payment_method_id = app.payments.register_payment_method("visa", "4242", 12, 2030);
    Ok(card_service::create_card(&app.state, user, CreateCardRequest { payment_method_id }).await?)
}
