//! Authorization policy.
//!
//! Admins act on every row. Standard users act only on websites they own,
//! the products of those websites, and their analytics. User administration
//! is admin-only.
//!
//! Two non-owner outcomes exist on purpose: website lookups are scoped by
//! owner so a stranger's website is indistinguishable from a missing one
//! (404), while products are fetched unscoped and then checked (403).

use super::auth::Caller;
use super::error::ApiError;

/// Row filter applied to owner-scoped queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    All,
    User(i64),
}

impl OwnerScope {
    pub fn for_caller(caller: &Caller) -> Self {
        if caller.is_admin() {
            OwnerScope::All
        } else {
            OwnerScope::User(caller.id)
        }
    }

    /// Bind value for `(? IS NULL OR user_id = ?)`
    pub fn owner_id(&self) -> Option<i64> {
        match self {
            OwnerScope::All => None,
            OwnerScope::User(id) => Some(*id),
        }
    }

    pub fn permits(&self, owner_id: i64) -> bool {
        match self {
            OwnerScope::All => true,
            OwnerScope::User(id) => *id == owner_id,
        }
    }
}

/// Mutations on a product require owning its website.
pub fn authorize_product(caller: &Caller, website_owner_id: i64) -> Result<(), ApiError> {
    if OwnerScope::for_caller(caller).permits(website_owner_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have permission to modify this product",
        ))
    }
}

pub fn authorize_user_admin(caller: &Caller) -> Result<(), ApiError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only admins can manage users"))
    }
}

/// Admin check plus a guard against deleting one's own account.
pub fn authorize_user_delete(caller: &Caller, target_id: i64) -> Result<(), ApiError> {
    authorize_user_admin(caller)?;
    if caller.id == target_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    Ok(())
}
