//! Core types for Sparkure.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pagination;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{Page, PageInfo};
pub use role::{Role, RoleParseError};
pub use status::*;
