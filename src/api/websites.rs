use axum::extract::State;
use std::sync::Arc;

use super::auth::Caller;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{AppJson, AppPath};
use super::policy::OwnerScope;
use super::response::{ApiResponse, ApiResult};
use super::validation::{validate_coordinate, validate_name, validate_url};
use crate::db::{
    now_timestamp, CreateWebsiteRequest, Patch, Product, PublicWebsite, UpdateWebsiteRequest,
    Website,
};
use crate::AppState;

/// Treat empty strings in optional text fields as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn slug_conflict() -> ApiError {
    ApiError::conflict("Website slug is already in use, choose another name")
}

/// Look up a website the caller may manage; strangers get the same 404 as a
/// missing slug.
async fn find_managed(state: &AppState, caller: &Caller, slug: &str) -> Result<Website, ApiError> {
    Website::find_by_slug(&state.db, slug, OwnerScope::for_caller(caller).owner_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Website not found"))
}

fn validate_create_request(req: &CreateWebsiteRequest) -> Result<String, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let slug = validate_name(req.name.as_deref().unwrap_or(""));
    if let Err(e) = &slug {
        errors.add("name", e.clone());
    }
    errors.check("url", validate_url(req.url.as_deref().unwrap_or("")));
    if let Some(lat) = req.lat {
        errors.check("lat", validate_coordinate(lat, 90.0));
    }
    if let Some(lng) = req.lng {
        errors.check("lng", validate_coordinate(lng, 180.0));
    }

    errors.finish()?;
    slug.map_err(ApiError::bad_request)
}

/// Validate a partial update; returns the regenerated slug when a name is given.
fn validate_update_request(req: &UpdateWebsiteRequest) -> Result<Option<String>, ApiError> {
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

    match &req.url {
        Patch::Value(url) => {
            errors.check("url", validate_url(url));
        }
        Patch::Null => {
            errors.add("url", "URL cannot be null");
        }
        Patch::Missing => {}
    }

    if let Some(lat) = req.lat.as_value() {
        errors.check("lat", validate_coordinate(*lat, 90.0));
    }
    if let Some(lng) = req.lng.as_value() {
        errors.check("lng", validate_coordinate(*lng, 180.0));
    }

    for (field, flag) in [
        ("status", &req.status),
        ("canAccess", &req.can_access),
        ("canExpired", &req.can_expired),
        ("hasProduct", &req.has_product),
    ] {
        if flag.is_null() {
            errors.add(field, format!("{} cannot be null", field));
        }
    }

    errors.finish()?;
    Ok(slug)
}

/// GET /api/websites
pub async fn list_websites(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Vec<Website>> {
    let websites =
        Website::list(&state.db, OwnerScope::for_caller(&caller).owner_id()).await?;
    Ok(ApiResponse::success("Website list", websites))
}

/// GET /api/websites/:slug (public)
pub async fn get_website(
    State(state): State<Arc<AppState>>,
    AppPath(slug): AppPath<String>,
) -> ApiResult<PublicWebsite> {
    let website = Website::find_by_slug(&state.db, &slug, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Website not found"))?;
    Ok(ApiResponse::success("Website detail", PublicWebsite::from(website)))
}

/// POST /api/websites
pub async fn create_website(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(req): AppJson<CreateWebsiteRequest>,
) -> ApiResult<Website> {
    let slug = validate_create_request(&req)?;

    if Website::slug_taken(&state.db, &slug, None).await? {
        return Err(slug_conflict());
    }

    let name = req.name.as_deref().unwrap_or_default().trim().to_string();
    let url = req.url.unwrap_or_default();
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO websites (
            slug, name, phone, lat, lng, address, logo, user_id, url,
            status, can_access, description, subdomain, can_expired, has_product,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, 1, ?, ?, 1, 0, ?, ?)
        "#,
    )
    .bind(&slug)
    .bind(&name)
    .bind(non_empty(req.phone))
    .bind(req.lat)
    .bind(req.lng)
    .bind(non_empty(req.address))
    .bind(non_empty(req.logo))
    .bind(caller.id)
    .bind(&url)
    .bind(non_empty(req.description))
    .bind(non_empty(req.subdomain))
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let website = Website::find_by_id(&state.db, id, None)
        .await?
        .ok_or_else(|| ApiError::internal("Website disappeared after insert"))?;

    tracing::info!(website_id = id, slug = %slug, user_id = caller.id, "Website created");
    Ok(ApiResponse::created("Website created", website))
}

/// PUT /api/websites/:slug
pub async fn update_website(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
    AppJson(req): AppJson<UpdateWebsiteRequest>,
) -> ApiResult<Website> {
    let existing = find_managed(&state, &caller, &slug).await?;
    let new_slug = validate_update_request(&req)?;

    let mut slug = existing.slug.clone();
    let mut name = existing.name.clone();
    if let (Patch::Value(new_name), Some(new_slug)) = (&req.name, new_slug) {
        let new_name = new_name.trim();
        if new_name != existing.name {
            if Website::slug_taken(&state.db, &new_slug, Some(existing.id)).await? {
                return Err(slug_conflict());
            }
            slug = new_slug;
            name = new_name.to_string();
        }
    }

    let url = req.url.apply_or(existing.url);
    let phone = req.phone.apply(existing.phone);
    let lat = req.lat.apply(existing.lat);
    let lng = req.lng.apply(existing.lng);
    let address = req.address.apply(existing.address);
    let logo = req.logo.apply(existing.logo);
    let description = req.description.apply(existing.description);
    let subdomain = req.subdomain.apply(existing.subdomain);
    let status = req.status.apply_or(existing.status);
    let can_access = req.can_access.apply_or(existing.can_access);
    let can_expired = req.can_expired.apply_or(existing.can_expired);
    let has_product = req.has_product.apply_or(existing.has_product);

    sqlx::query(
        r#"
        UPDATE websites SET
            slug = ?,
            name = ?,
            url = ?,
            phone = ?,
            lat = ?,
            lng = ?,
            address = ?,
            logo = ?,
            description = ?,
            subdomain = ?,
            status = ?,
            can_access = ?,
            can_expired = ?,
            has_product = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&slug)
    .bind(&name)
    .bind(&url)
    .bind(&phone)
    .bind(lat)
    .bind(lng)
    .bind(&address)
    .bind(&logo)
    .bind(&description)
    .bind(&subdomain)
    .bind(status)
    .bind(can_access)
    .bind(can_expired)
    .bind(has_product)
    .bind(now_timestamp())
    .bind(existing.id)
    .execute(&state.db)
    .await?;

    let website = Website::find_by_id(&state.db, existing.id, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Website not found"))?;

    tracing::info!(website_id = website.id, "Website updated");
    Ok(ApiResponse::success("Website updated", website))
}

/// DELETE /api/websites/:slug
pub async fn delete_website(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
) -> ApiResult<()> {
    let website = find_managed(&state, &caller, &slug).await?;

    Website::soft_delete_cascade(&state.db, website.id).await?;

    tracing::info!(website_id = website.id, user_id = caller.id, "Website deleted");
    Ok(ApiResponse::success("Website deleted", ()))
}

/// GET /api/websites/:slug/products (public)
pub async fn list_website_products(
    State(state): State<Arc<AppState>>,
    AppPath(slug): AppPath<String>,
) -> ApiResult<Vec<Product>> {
    let website = Website::find_by_slug(&state.db, &slug, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Website not found"))?;

    let products = Product::list_for_website(&state.db, website.id).await?;
    Ok(ApiResponse::success("Product list", products))
}
