use axum::extract::State;
use std::sync::Arc;

use super::auth::Caller;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{AppJson, AppPath};
use super::policy::{authorize_product, OwnerScope};
use super::response::{ApiResponse, ApiResult};
use super::validation::{validate_amount, validate_name, validate_percent};
use super::websites::non_empty;
use crate::db::{
    now_timestamp, CreateProductRequest, Patch, Product, ProductWithWebsite,
    ProductWithWebsiteRow, UpdateProductRequest, Website,
};
use crate::AppState;

fn slug_conflict() -> ApiError {
    ApiError::conflict("Product slug is already in use, choose another name")
}

async fn find_product(state: &AppState, slug: &str) -> Result<ProductWithWebsiteRow, ApiError> {
    ProductWithWebsiteRow::find_by_slug(&state.db, slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

fn check_pricing(
    errors: &mut ValidationErrorBuilder,
    price: Option<f64>,
    discount_percent: Option<f64>,
    discount_amount: Option<f64>,
) {
    if let Some(price) = price {
        errors.check("price", validate_amount(price));
    }
    if let Some(percent) = discount_percent {
        errors.check("discountPercent", validate_percent(percent));
    }
    if let Some(amount) = discount_amount {
        errors.check("discountAmount", validate_amount(amount));
    }
}

fn validate_create_request(req: &CreateProductRequest) -> Result<(String, i64), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let slug = validate_name(req.name.as_deref().unwrap_or(""));
    if let Err(e) = &slug {
        errors.add("name", e.clone());
    }
    if req.website_id.is_none() {
        errors.add("websiteId", "Website ID is required");
    }
    check_pricing(
        &mut errors,
        req.price,
        req.discount_percent,
        req.discount_amount,
    );

    errors.finish()?;
    let slug = slug.map_err(ApiError::bad_request)?;
    let website_id = req
        .website_id
        .ok_or_else(|| ApiError::validation_field("websiteId", "Website ID is required"))?;
    Ok((slug, website_id))
}

/// Validate a partial update; returns the regenerated slug when a name is given.
fn validate_update_request(req: &UpdateProductRequest) -> Result<Option<String>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let mut slug = None;
    match &req.name {
        Patch::Value(name) => match validate_name(name) {
            Ok(s) => slug = Some(s),
            Err(e) => {
                errors.add("name", e);
            }
        },
        Patch::Null => {
            errors.add("name", "Name cannot be null");
        }
        Patch::Missing => {}
    }

    if req.price.is_null() {
        errors.add("price", "Price cannot be null");
    }
    for (field, flag) in [("hasStock", &req.has_stock), ("status", &req.status)] {
        if flag.is_null() {
            errors.add(field, format!("{} cannot be null", field));
        }
    }
    check_pricing(
        &mut errors,
        req.price.as_value().copied(),
        req.discount_percent.as_value().copied(),
        req.discount_amount.as_value().copied(),
    );

    errors.finish()?;
    Ok(slug)
}

/// GET /api/products
///
/// Admins see every product; other callers see products of their own websites.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Vec<ProductWithWebsite>> {
    let rows =
        ProductWithWebsiteRow::list(&state.db, OwnerScope::for_caller(&caller).owner_id()).await?;
    let products = rows
        .into_iter()
        .map(ProductWithWebsiteRow::into_response)
        .collect();
    Ok(ApiResponse::success("Product list", products))
}

/// GET /api/products/:slug (public)
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    AppPath(slug): AppPath<String>,
) -> ApiResult<ProductWithWebsite> {
    let row = find_product(&state, &slug).await?;
    Ok(ApiResponse::success("Product detail", row.into_response()))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(req): AppJson<CreateProductRequest>,
) -> ApiResult<ProductWithWebsite> {
    let (slug, website_id) = validate_create_request(&req)?;

    let website = Website::find_by_id(
        &state.db,
        website_id,
        OwnerScope::for_caller(&caller).owner_id(),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Website not found"))?;

    if Product::slug_taken(&state.db, &slug, None).await? {
        return Err(slug_conflict());
    }

    let name = req.name.as_deref().unwrap_or_default().trim().to_string();
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO products (
            slug, name, description, price, discount_percent, discount_amount,
            image, has_stock, website_id, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&slug)
    .bind(&name)
    .bind(non_empty(req.description))
    .bind(req.price.unwrap_or(0.0))
    .bind(req.discount_percent)
    .bind(req.discount_amount)
    .bind(non_empty(req.image))
    .bind(req.has_stock.unwrap_or(true))
    .bind(website.id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let row = find_product(&state, &slug).await?;

    tracing::info!(product_id = id, website_id = website.id, slug = %slug, "Product created");
    Ok(ApiResponse::created("Product created", row.into_response()))
}

/// PUT /api/products/:slug
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
    AppJson(req): AppJson<UpdateProductRequest>,
) -> ApiResult<ProductWithWebsite> {
    let row = find_product(&state, &slug).await?;
    authorize_product(&caller, row.owner_id)?;
    let new_slug = validate_update_request(&req)?;

    let existing = row.product;
    let mut slug = existing.slug.clone();
    let mut name = existing.name.clone();
    if let (Patch::Value(new_name), Some(new_slug)) = (&req.name, new_slug) {
        let new_name = new_name.trim();
        if new_name != existing.name {
            if Product::slug_taken(&state.db, &new_slug, Some(existing.id)).await? {
                return Err(slug_conflict());
            }
            slug = new_slug;
            name = new_name.to_string();
        }
    }

    let description = req.description.apply(existing.description);
    let price = req.price.apply_or(existing.price);
    let discount_percent = req.discount_percent.apply(existing.discount_percent);
    let discount_amount = req.discount_amount.apply(existing.discount_amount);
    let image = req.image.apply(existing.image);
    let has_stock = req.has_stock.apply_or(existing.has_stock);
    let status = req.status.apply_or(existing.status);

    sqlx::query(
        r#"
        UPDATE products SET
            slug = ?,
            name = ?,
            description = ?,
            price = ?,
            discount_percent = ?,
            discount_amount = ?,
            image = ?,
            has_stock = ?,
            status = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&slug)
    .bind(&name)
    .bind(&description)
    .bind(price)
    .bind(discount_percent)
    .bind(discount_amount)
    .bind(&image)
    .bind(has_stock)
    .bind(status)
    .bind(now_timestamp())
    .bind(existing.id)
    .execute(&state.db)
    .await?;

    let updated = find_product(&state, &slug).await?;

    tracing::info!(product_id = existing.id, "Product updated");
    Ok(ApiResponse::success("Product updated", updated.into_response()))
}

/// DELETE /api/products/:slug
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
) -> ApiResult<()> {
    let row = find_product(&state, &slug).await?;
    authorize_product(&caller, row.owner_id)?;

    Product::soft_delete_cascade(&state.db, row.product.id).await?;

    tracing::info!(product_id = row.product.id, user_id = caller.id, "Product deleted");
    Ok(ApiResponse::success("Product deleted", ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;

    #[test]
    fn test_create_requires_name_and_website() {
        let req: CreateProductRequest = serde_json::from_str(r#"{"price": 5}"#).unwrap();
        let err = validate_create_request(&req).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let req: CreateProductRequest =
            serde_json::from_str(r#"{"name": "Red Shirt", "websiteId": 3}"#).unwrap();
        assert_eq!(
            validate_create_request(&req).unwrap(),
            ("red-shirt".to_string(), 3)
        );
    }

    #[test]
    fn test_pricing_bounds() {
        let req: CreateProductRequest = serde_json::from_str(
            r#"{"name": "X", "websiteId": 1, "price": -1, "discountPercent": 120}"#,
        )
        .unwrap();
        let err = validate_create_request(&req).unwrap_err();
        assert!(err.message().contains("2 fields"));
    }

    #[test]
    fn test_update_allows_clearing_discount() {
        let req: UpdateProductRequest =
            serde_json::from_str(r#"{"discountPercent": null, "image": null}"#).unwrap();
        assert_eq!(validate_update_request(&req).unwrap(), None);

        let req: UpdateProductRequest = serde_json::from_str(r#"{"price": null}"#).unwrap();
        assert!(validate_update_request(&req).is_err());
    }
}
