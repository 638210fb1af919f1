use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit::log_audit,
    dto::products::CreateCategoryRequest,
    entity::Category,
    error::{AppError, AppResult},
    field::{FieldValue, UpdateFields},
    middleware::auth::{AuthUser, ensure_admin},
    services::strip_fields,
    state::AppState,
};

const PROTECTED_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<Category> {
    ensure_admin(user)?;
    payload.validate()?;

    let _guard = state.catalog_lock.lock().await;
    if state
        .categories
        .find_by_field("name", payload.name.as_str())?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "Category {} already exists",
            payload.name
        )));
    }

    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        created_at: now,
        updated_at: now,
    };
    state.categories.save(&category)?;

    log_audit(
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    );
    Ok(category)
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<Category> {
    state.categories.find_by_id(&id)
}

pub async fn list_categories(state: &AppState) -> AppResult<Vec<Category>> {
    let mut categories = state.categories.find()?;
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    fields: UpdateFields,
) -> AppResult<Category> {
    ensure_admin(user)?;
    let fields = strip_fields(fields, PROTECTED_FIELDS);

    let _guard = state.catalog_lock.lock().await;
    if let Some(name) = fields.get("name").and_then(FieldValue::as_string) {
        if let Some(existing) = state.categories.find_by_field("name", name)? {
            if existing.id != id {
                return Err(AppError::Conflict(format!("Category {name} already exists")));
            }
        }
    }
    let category = state.categories.update(&id, fields)?;

    log_audit(
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    );
    Ok(category)
}

/// Fails with `InUse` while any product references the category. The
/// check and the delete run under the catalog lock, so a concurrent
/// product write cannot slip in between.
pub async fn delete_category(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;

    let _guard = state.catalog_lock.lock().await;
    let category = state.categories.find_by_id(&id)?;
    let in_use = state.products.find_where("category_id", "==", id)?;
    if !in_use.is_empty() {
        return Err(AppError::InUse(format!(
            "Category {} ({} products)",
            category.name,
            in_use.len()
        )));
    }
    state.categories.remove(&id)?;

    log_audit(
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    );
    Ok(())
}
