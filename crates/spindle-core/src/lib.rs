//! # Spindle Core
//!
//! Shared, I/O-free logic for spindle: release models, tag normalization,
//! page URL building, listing filters, collection statistics, and the
//! release store abstraction.
//!
//! This crate contains no tokio runtime, sqlx, HTTP, or filesystem code.
//! Everything that touches the network or disk lives in the `spindle`
//! crate and talks to this one through [`store::ReleaseStore`].

pub mod filter;
pub mod models;
pub mod stats;
pub mod store;
pub mod tags;
pub mod url;
