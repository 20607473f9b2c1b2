//! Extractors whose rejections use the API failure envelope.

use axum::extract::{FromRequest, FromRequestParts};

use super::error::ApiError;

/// `Json` body that rejects with a 400 envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `Query` string that rejects with a 400 envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// `Path` parameters that reject with a 400 envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);
