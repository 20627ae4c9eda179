//! Traft storefront checkout library.
//!
//! Cart, pricing, UPI payment links, the resumable checkout session and the
//! clients for the order and content APIs. The `traft` CLI and the
//! integration tests drive it through these modules.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod error;
pub mod orders;
pub mod payment_link;
pub mod pricing;
pub mod storage;
