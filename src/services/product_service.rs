use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::log_audit,
    dto::products::CreateProductRequest,
    entity::{Entity, Product},
    error::{AppError, AppResult},
    field::{FieldValue, UpdateFields},
    middleware::auth::{AuthUser, ensure_admin},
    services::strip_fields,
    state::AppState,
};

const PROTECTED_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;
    payload.validate()?;

    let _guard = state.catalog_lock.lock().await;
    state.categories.find_by_id(&payload.category_id)?;

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        price: payload.price,
        discount_rate: payload.discount_rate,
        stock: payload.stock,
        available: payload.available,
        category_id: payload.category_id,
        created_at: now,
        updated_at: now,
    };
    state.products.save(&product)?;

    log_audit(
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    );
    Ok(product)
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    state.products.find_by_id(&id)
}

pub async fn list_products(state: &AppState) -> AppResult<Vec<Product>> {
    let mut products = state.products.find()?;
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(products)
}

pub async fn list_by_category(state: &AppState, category_id: Uuid) -> AppResult<Vec<Product>> {
    state.categories.find_by_id(&category_id)?;
    state.products.find_where("category_id", "==", category_id)
}

/// Products whose list price is at most `max_price`, cheapest first.
pub async fn list_by_max_price(state: &AppState, max_price: i64) -> AppResult<Vec<Product>> {
    let mut products = state.products.find_where("price", "<=", max_price)?;
    products.sort_by_key(|p| p.price);
    Ok(products)
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    fields: UpdateFields,
) -> AppResult<Product> {
    ensure_admin(user)?;
    let fields = strip_fields(fields, PROTECTED_FIELDS);
    check_ranges(&fields)?;

    let _guard = state.catalog_lock.lock().await;
    if let Some(value) = fields.get("category_id") {
        let category_id = Product::field_def("category_id")?
            .coerce(value.clone())?
            .as_uuid()
            .ok_or_else(|| AppError::BadRequest("category_id cannot be null".to_string()))?;
        state.categories.find_by_id(&category_id)?;
    }
    let product = state.products.update(&id, fields)?;

    log_audit(
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    );
    Ok(product)
}

pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;
    state.products.remove(&id)?;

    log_audit(
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    );
    Ok(())
}

pub async fn discounted_unit_price(state: &AppState, id: Uuid) -> AppResult<i64> {
    state
        .products
        .find_by_id(&id)?
        .discounted_price()
        .ok_or(AppError::InvalidProduct(id))
}

fn check_ranges(fields: &UpdateFields) -> AppResult<()> {
    for (field, min, max) in [
        ("price", 0, i64::MAX),
        ("stock", 0, i64::MAX),
        ("discount_rate", 0, 100),
    ] {
        if let Some(value) = fields.get(field).and_then(FieldValue::as_integer) {
            if value < min || value > max {
                return Err(AppError::BadRequest(format!("{field} is out of range")));
            }
        }
    }
    Ok(())
}
