//! Visitor analytics events and the reporting queries over them.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::{now_timestamp, DateRange, PageParams};

/// Kind of visitor interaction being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    ProductView,
    CtaPageClick,
    CtaProductClick,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::PageView,
        EventType::ProductView,
        EventType::CtaPageClick,
        EventType::CtaProductClick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::ProductView => "product_view",
            EventType::CtaPageClick => "cta_page_click",
            EventType::CtaProductClick => "cta_product_click",
        }
    }

    /// Product-scoped events must reference a product.
    pub fn is_product_scoped(&self) -> bool {
        matches!(self, EventType::ProductView | EventType::CtaProductClick)
    }

    /// Comma separated list of accepted values, for error messages
    pub fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("eventType must be one of: {}", Self::allowed()))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New event as captured from a tracking request
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub website_id: i64,
    pub product_id: Option<i64>,
    pub visitor_ip: String,
    pub user_agent: String,
    pub referer: Option<String>,
}

impl NewEvent {
    pub async fn insert(&self, db: &SqlitePool) -> Result<i64, sqlx::Error> {
        let now = now_timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO analytics (event_type, website_id, product_id, visitor_ip, user_agent, referer, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(self.event_type.as_str())
        .bind(self.website_id)
        .bind(self.product_id)
        .bind(&self.visitor_ip)
        .bind(&self.user_agent)
        .bind(&self.referer)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct EventCounts {
    pub page_views: i64,
    pub product_views: i64,
    pub cta_page_clicks: i64,
    pub cta_product_clicks: i64,
    pub unique_visitors: i64,
}

impl EventCounts {
    pub fn total(&self) -> i64 {
        self.page_views + self.product_views + self.cta_page_clicks + self.cta_product_clicks
    }

    /// Per-type counts and distinct visitor IPs for one website.
    pub async fn for_website(
        db: &SqlitePool,
        website_id: i64,
        range: &DateRange,
    ) -> Result<EventCounts, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN event_type = 'page_view' THEN 1 ELSE 0 END), 0) AS page_views,
                COALESCE(SUM(CASE WHEN event_type = 'product_view' THEN 1 ELSE 0 END), 0) AS product_views,
                COALESCE(SUM(CASE WHEN event_type = 'cta_page_click' THEN 1 ELSE 0 END), 0) AS cta_page_clicks,
                COALESCE(SUM(CASE WHEN event_type = 'cta_product_click' THEN 1 ELSE 0 END), 0) AS cta_product_clicks,
                COUNT(DISTINCT visitor_ip) AS unique_visitors
            FROM analytics
            WHERE website_id = ? AND deleted_at IS NULL
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at <= ?)
            "#,
        )
        .bind(website_id)
        .bind(&range.start)
        .bind(&range.start)
        .bind(&range.end)
        .bind(&range.end)
        .fetch_one(db)
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: String,
    pub event_type: String,
    pub count: i64,
}

impl DailyStat {
    /// Event counts grouped by UTC day and type, newest day first.
    pub async fn for_website(
        db: &SqlitePool,
        website_id: i64,
        range: &DateRange,
        event_type: Option<EventType>,
    ) -> Result<Vec<DailyStat>, sqlx::Error> {
        let event_type = event_type.map(|t| t.as_str());
        sqlx::query_as(
            r#"
            SELECT DATE(created_at) AS date, event_type, COUNT(id) AS count
            FROM analytics
            WHERE website_id = ? AND deleted_at IS NULL
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at <= ?)
              AND (? IS NULL OR event_type = ?)
            GROUP BY DATE(created_at), event_type
            ORDER BY date DESC, event_type ASC
            "#,
        )
        .bind(website_id)
        .bind(&range.start)
        .bind(&range.start)
        .bind(&range.end)
        .bind(&range.end)
        .bind(event_type)
        .bind(event_type)
        .fetch_all(db)
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product: TopProductInfo,
    pub count: i64,
}

#[derive(Debug, FromRow)]
struct TopProductRow {
    id: i64,
    slug: String,
    name: String,
    price: f64,
    count: i64,
}

impl TopProduct {
    /// Products of a website ranked by number of `event_type` events.
    pub async fn for_website(
        db: &SqlitePool,
        website_id: i64,
        event_type: EventType,
        limit: i64,
    ) -> Result<Vec<TopProduct>, sqlx::Error> {
        let rows: Vec<TopProductRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.slug, p.name, p.price, COUNT(a.id) AS count
            FROM analytics a
            INNER JOIN products p ON p.id = a.product_id
            WHERE a.website_id = ? AND a.event_type = ?
              AND a.product_id IS NOT NULL
              AND a.deleted_at IS NULL AND p.deleted_at IS NULL
            GROUP BY p.id
            ORDER BY count DESC, p.id ASC
            LIMIT ?
            "#,
        )
        .bind(website_id)
        .bind(event_type.as_str())
        .bind(limit)
        .fetch_all(db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TopProduct {
                product: TopProductInfo {
                    id: r.id,
                    slug: r.slug,
                    name: r.name,
                    price: r.price,
                },
                count: r.count,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProduct {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// A stored event as listed to website owners
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticEvent {
    pub id: i64,
    pub event_type: String,
    pub website_id: i64,
    pub product_id: Option<i64>,
    pub visitor_ip: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub product: Option<EventProduct>,
}

#[derive(Debug, FromRow)]
struct AnalyticEventRow {
    id: i64,
    event_type: String,
    website_id: i64,
    product_id: Option<i64>,
    visitor_ip: String,
    user_agent: String,
    referer: Option<String>,
    created_at: String,
    updated_at: String,
    product_slug: Option<String>,
    product_name: Option<String>,
}

impl From<AnalyticEventRow> for AnalyticEvent {
    fn from(row: AnalyticEventRow) -> Self {
        let product = match (row.product_id, row.product_slug, row.product_name) {
            (Some(id), Some(slug), Some(name)) => Some(EventProduct { id, slug, name }),
            _ => None,
        };

        Self {
            id: row.id,
            event_type: row.event_type,
            website_id: row.website_id,
            product_id: row.product_id,
            visitor_ip: row.visitor_ip,
            user_agent: row.user_agent,
            referer: row.referer,
            created_at: row.created_at,
            updated_at: row.updated_at,
            product,
        }
    }
}

impl AnalyticEvent {
    /// One page of a website's events, newest first, plus the total count.
    pub async fn page_for_website(
        db: &SqlitePool,
        website_id: i64,
        event_type: Option<EventType>,
        page: PageParams,
    ) -> Result<(Vec<AnalyticEvent>, i64), sqlx::Error> {
        let event_type = event_type.map(|t| t.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM analytics
            WHERE website_id = ? AND deleted_at IS NULL AND (? IS NULL OR event_type = ?)
            "#,
        )
        .bind(website_id)
        .bind(event_type)
        .bind(event_type)
        .fetch_one(db)
        .await?;

        let rows: Vec<AnalyticEventRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.event_type, a.website_id, a.product_id, a.visitor_ip, a.user_agent,
                   a.referer, a.created_at, a.updated_at,
                   p.slug AS product_slug, p.name AS product_name
            FROM analytics a
            LEFT JOIN products p ON p.id = a.product_id
            WHERE a.website_id = ? AND a.deleted_at IS NULL AND (? IS NULL OR a.event_type = ?)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(website_id)
        .bind(event_type)
        .bind(event_type)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(db)
        .await?;

        Ok((rows.into_iter().map(AnalyticEvent::from).collect(), total))
    }
}
