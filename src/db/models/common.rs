//! Common types and utilities shared across models.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Current time in the storage format (UTC, millisecond precision, `Z` suffix).
///
/// Every timestamp column uses this layout so string comparison in SQL is
/// chronological and `DATE(created_at)` yields the UTC calendar day.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate a URL-friendly slug from a name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single dash and trims dashes from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// A field in a partial update.
///
/// `Missing` means the key was absent (leave the column alone), `Null` means
/// the client sent `null` (clear it), `Value` carries the new value. Fields
/// must be annotated with `#[serde(default)]` so absence maps to `Missing`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Null)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve against a nullable column.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Missing => current,
            Patch::Null => None,
            Patch::Value(v) => Some(v),
        }
    }

    /// Resolve against a NOT NULL column. Callers reject `Null` during
    /// validation; if one slips through the current value is kept.
    pub fn apply_or(self, current: T) -> T {
        match self {
            Patch::Value(v) => v,
            Patch::Missing | Patch::Null => current,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

/// Which end of a date range a filter value bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Start,
    End,
}

/// Parse a date filter into the storage timestamp format.
///
/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates. A bare date used
/// as an end bound covers the whole day.
pub fn parse_date_bound(raw: &str, side: BoundSide) -> Result<String, String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(format_timestamp(dt.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", raw))?;

    let time = match side {
        BoundSide::Start => NaiveTime::from_hms_opt(0, 0, 0),
        BoundSide::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999),
    }
    .ok_or_else(|| "Invalid time of day".to_string())?;

    Ok(format_timestamp(date.and_time(time).and_utc()))
}

/// Inclusive creation-time window; `None` leaves that side unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, String> {
        Ok(Self {
            start: start
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_date_bound(s, BoundSide::Start))
                .transpose()?,
            end: end
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_date_bound(s, BoundSide::End))
                .transpose()?,
        })
    }
}

/// Offset pagination request, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub const MAX_LIMIT: i64 = 100;

    /// Build page parameters, rejecting values below 1 or past the addressable
    /// range, and capping the limit.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Result<Self, String> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);

        if page < 1 {
            return Err("page must be at least 1".to_string());
        }
        if limit < 1 {
            return Err("limit must be at least 1".to_string());
        }

        let limit = limit.min(Self::MAX_LIMIT);
        if (page - 1).checked_mul(limit).is_none() {
            return Err("page is out of range".to_string());
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Pagination block returned alongside a page of results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(params: PageParams, total_items: i64) -> Self {
        let total_pages = (total_items + params.limit - 1) / params.limit;
        Self {
            page: params.page,
            limit: params.limit,
            total_items,
            total_pages,
        }
    }
}
