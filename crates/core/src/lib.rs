//! Sparkure Core - domain types and access rules.
//!
//! This crate is shared by every Sparkure component:
//! - `server` - JSON API for customers, employees and administrators
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Everything here can be unit tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, status enums and pagination
//! - [`policy`] - The single place that decides who may do what to a booking

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod policy;
pub mod types;

pub use policy::{Action, Actor, EditableField, PolicyError, Resource, authorize};
pub use types::*;
