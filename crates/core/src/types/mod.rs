//! Core types for Spice Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod status;

pub use cart::{CartEntry, CartLineItem, NormalizedCartEntry};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use product::{NewProduct, Product};
pub use status::*;
