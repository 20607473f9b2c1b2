//! Visitor event ingestion and per-website reporting.

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use super::auth::Caller;
use super::error::ApiError;
use super::extract::{AppJson, AppPath, AppQuery};
use super::policy::OwnerScope;
use super::response::{ApiResponse, ApiResult};
use crate::db::{
    AnalyticEvent, DailyStat, DateRange, EventCounts, EventType, NewEvent, PageParams,
    Pagination, Product, TopProduct, Website,
};
use crate::AppState;

const UNKNOWN_IP: &str = "0.0.0.0";
const UNKNOWN_USER_AGENT: &str = "unknown";
const DEFAULT_TOP_PRODUCTS: i64 = 10;
const DEFAULT_EVENTS_PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub event_type: Option<String>,
    pub website_id: Option<i64>,
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrackEventResponse {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub event_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductsQuery {
    pub limit: Option<i64>,
    pub event_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub event_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub website_slug: String,
    pub website_name: String,
    pub period: Period,
    pub page_views: i64,
    pub product_views: i64,
    pub cta_page_clicks: i64,
    pub cta_product_clicks: i64,
    pub total_events: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Serialize)]
pub struct EventsPage {
    pub events: Vec<AnalyticEvent>,
    pub pagination: Pagination,
}

/// Best-effort client address: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Parse an optional `eventType` filter; blank means no filter
fn parse_event_filter(raw: Option<&str>) -> Result<Option<EventType>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: String| ApiError::validation_field("eventType", e)),
        None => Ok(None),
    }
}

fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, ApiError> {
    DateRange::parse(start, end).map_err(|e| ApiError::validation_field("date", e))
}

/// Resolve a website the caller may read analytics for.
async fn find_reportable(
    state: &AppState,
    caller: &Caller,
    slug: &str,
) -> Result<Website, ApiError> {
    Website::find_by_slug(&state.db, slug, OwnerScope::for_caller(caller).owner_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Website not found"))
}

/// Validate a tracking request in order: event type, website id, website,
/// product id (for product events), product.
async fn validate_track_request(
    state: &AppState,
    req: &TrackEventRequest,
) -> Result<(EventType, Website, Option<Product>), ApiError> {
    let event_type: EventType = req
        .event_type
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|e: String| ApiError::validation_field("eventType", e))?;

    let website_id = req
        .website_id
        .ok_or_else(|| ApiError::validation_field("websiteId", "websiteId is required"))?;

    let website = Website::find_by_id(&state.db, website_id, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Website not found"))?;

    if event_type.is_product_scoped() && req.product_id.is_none() {
        return Err(ApiError::validation_field(
            "productId",
            format!("productId is required for {} events", event_type),
        ));
    }

    let product = match req.product_id {
        Some(product_id) => {
            let product = Product::find_by_id(&state.db, product_id)
                .await?
                .filter(|p| p.website_id == website.id)
                .ok_or_else(|| ApiError::not_found("Product not found"))?;
            Some(product)
        }
        None => None,
    };

    Ok((event_type, website, product))
}

/// POST /api/analytics/track (public)
pub async fn track_event(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AppJson(req): AppJson<TrackEventRequest>,
) -> ApiResult<TrackEventResponse> {
    let (event_type, website, product) = validate_track_request(&state, &req).await?;

    let event = NewEvent {
        event_type,
        website_id: website.id,
        product_id: product.map(|p| p.id),
        visitor_ip: extract_client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)),
        user_agent: header_value(&headers, header::USER_AGENT)
            .unwrap_or_else(|| UNKNOWN_USER_AGENT.to_string()),
        referer: header_value(&headers, header::REFERER),
    };

    let id = event.insert(&state.db).await?;

    tracing::debug!(event_id = id, website_id = website.id, event_type = %event_type, "Event recorded");
    Ok(ApiResponse::created("Event recorded", TrackEventResponse { id }))
}

/// GET /api/analytics/summary/:websiteSlug
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
    AppQuery(query): AppQuery<StatsQuery>,
) -> ApiResult<AnalyticsSummary> {
    let website = find_reportable(&state, &caller, &slug).await?;
    let range = parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;

    let counts = EventCounts::for_website(&state.db, website.id, &range).await?;

    Ok(ApiResponse::success(
        "Analytics summary",
        AnalyticsSummary {
            website_slug: website.slug,
            website_name: website.name,
            period: Period {
                start_date: query.start_date.filter(|s| !s.trim().is_empty()),
                end_date: query.end_date.filter(|s| !s.trim().is_empty()),
            },
            page_views: counts.page_views,
            product_views: counts.product_views,
            cta_page_clicks: counts.cta_page_clicks,
            cta_product_clicks: counts.cta_product_clicks,
            total_events: counts.total(),
            unique_visitors: counts.unique_visitors,
        },
    ))
}

/// GET /api/analytics/daily/:websiteSlug
pub async fn get_daily_stats(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
    AppQuery(query): AppQuery<StatsQuery>,
) -> ApiResult<Vec<DailyStat>> {
    let website = find_reportable(&state, &caller, &slug).await?;
    let range = parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let event_type = parse_event_filter(query.event_type.as_deref())?;

    let stats = DailyStat::for_website(&state.db, website.id, &range, event_type).await?;
    Ok(ApiResponse::success("Daily statistics", stats))
}

/// GET /api/analytics/top-products/:websiteSlug
///
/// `limit` defaults to 10 and is capped at [`PageParams::MAX_LIMIT`]; a
/// larger value returns at most that many products.
pub async fn get_top_products(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
    AppQuery(query): AppQuery<TopProductsQuery>,
) -> ApiResult<Vec<TopProduct>> {
    let website = find_reportable(&state, &caller, &slug).await?;
    let event_type =
        parse_event_filter(query.event_type.as_deref())?.unwrap_or(EventType::ProductView);
    let limit = PageParams::new(None, query.limit, DEFAULT_TOP_PRODUCTS)
        .map_err(|e| ApiError::validation_field("limit", e))?
        .limit;

    let top = TopProduct::for_website(&state.db, website.id, event_type, limit).await?;
    Ok(ApiResponse::success("Top products", top))
}

/// GET /api/analytics/events/:websiteSlug
pub async fn get_events(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(slug): AppPath<String>,
    AppQuery(query): AppQuery<EventsQuery>,
) -> ApiResult<EventsPage> {
    let website = find_reportable(&state, &caller, &slug).await?;
    let event_type = parse_event_filter(query.event_type.as_deref())?;
    let page = PageParams::new(query.page, query.limit, DEFAULT_EVENTS_PAGE_SIZE)
        .map_err(ApiError::bad_request)?;

    let (events, total) =
        AnalyticEvent::page_for_website(&state.db, website.id, event_type, page).await?;

    Ok(ApiResponse::success(
        "Event list",
        EventsPage {
            events,
            pagination: Pagination::new(page, total),
        },
    ))
}
