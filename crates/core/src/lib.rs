//! Traft Core - Shared types library.
//!
//! This crate provides common types used across all Traft components:
//! - `storefront` - Cart, pricing, payment links, checkout and API clients
//! - `cli` - Command-line front end for browsing and checking out
//!
//! # Architecture
//!
//! The core crate contains only types and parsing - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, contact fields, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
