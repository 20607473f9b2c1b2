//! Database models split into domain-specific modules.

pub mod analytic;
pub mod common;
pub mod product;
pub mod user;
pub mod website;

pub use analytic::*;
pub use common::*;
pub use product::*;
pub use user::*;
pub use website::*;
