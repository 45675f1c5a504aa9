//! Spice Market storefront client.
//!
//! The data synchronization layer between the storefront UI and the remote
//! product/cart service: an entity cache with coalesced fetches, cart
//! normalization and product joining, cart mutations with cache
//! invalidation, and one-shot catalog seeding.
//!
//! [`StorefrontClient`] is the entry point.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod cart;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handoff;
pub mod mutation;
pub mod seed;
pub mod telemetry;

pub use client::StorefrontClient;
pub use error::{AppError, Result};
