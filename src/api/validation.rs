//! Input validation for API requests.
//!
//! Each validator returns `Err(message)`; handlers collect them with
//! `ValidationErrorBuilder::check` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::slugify;

lazy_static! {
    /// Absolute http(s) URL without whitespace
    static ref HTTP_URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9]([-a-zA-Z0-9.]*[a-zA-Z0-9])?(:\d{1,5})?([/?#]\S*)?$"
    ).unwrap();

    /// Usernames: letters, digits, dot, dash and underscore
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 6;
const MAX_NAME_LEN: usize = 255;
const MAX_URL_LEN: usize = 2048;
const MAX_USERNAME_LEN: usize = 100;

/// Validate a website or product name and return its slug
pub fn validate_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name is too long (max {} characters)", MAX_NAME_LEN));
    }

    let slug = slugify(trimmed);
    if slug.is_empty() {
        return Err("Name must contain at least one letter or digit".to_string());
    }
    Ok(slug)
}

pub fn validate_url(url: &str) -> Result<(), String> {
    if url.trim().is_empty() {
        return Err("URL is required".to_string());
    }
    if url.len() > MAX_URL_LEN {
        return Err(format!("URL is too long (max {} characters)", MAX_URL_LEN));
    }
    if !HTTP_URL_REGEX.is_match(url) {
        return Err("URL must be an absolute http(s) URL".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username is too long (max {} characters)",
            MAX_USERNAME_LEN
        ));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username may only contain letters, digits, dots, dashes and underscores".to_string(),
        );
    }
    Ok(())
}

/// Non-negative amount such as a price
pub fn validate_amount(value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err("Must be a non-negative number".to_string());
    }
    Ok(())
}

pub fn validate_percent(value: f64) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err("Must be between 0 and 100".to_string());
    }
    Ok(())
}

pub fn validate_coordinate(value: f64, bound: f64) -> Result<(), String> {
    if !value.is_finite() || value.abs() > bound {
        return Err(format!("Must be between -{} and {}", bound, bound));
    }
    Ok(())
}
