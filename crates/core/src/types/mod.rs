//! Core types for the Traft storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod price;
pub mod status;
pub mod transaction;

pub use contact::{PhoneNumber, PhoneNumberError, Pincode, PincodeError};
pub use id::*;
pub use price::{CurrencyCode, Money};
pub use status::*;
pub use transaction::{TransactionRef, TransactionRefError};
