//! Discogs metadata source.
//!
//! Split into three layers (DTOs, adapter, client) so that API format
//! changes stay contained in this module.

mod adapter;
mod client;
mod dto;

pub use client::DiscogsClient;
