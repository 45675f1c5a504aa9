//! Spice Market Core - Shared types library.
//!
//! This crate provides common types used across all Spice Market components:
//! - `storefront` - Client-side synchronization layer (cache, cart views, seeding)
//! - `cli` - Command-line driver for the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no caching, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product and cart records, type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
