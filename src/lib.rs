//! # Spindle
//!
//! A music collection catalog with a crawl-based enrichment pipeline.
//!
//! Releases (albums and recordings) live in a SQLite catalog. The
//! enrichment run visits each incomplete release's page on the external
//! music site, scrapes its release date, genre tags and cover art, then
//! writes a normalized tag list, a year and a stored cover image back to
//! the catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Catalog   │──▶│ Orchestrator │──▶│   Router    │──▶│ Extractor│
//! │  (SQLite)  │   │   (enrich)   │   │ (per-release│   │ (scraper)│
//! └─────▲──────┘   └──────┬───────┘   │ accumulator)│   └──────────┘
//!       │                 │           └─────────────┘
//!       │                 ▼
//!       │          ┌──────────────┐
//!       └──────────│  Normalizer  │
//!                  │ (tags, year) │
//!                  └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! spindle init
//! spindle add --external-id 1001 --artist "Portishead" --title "Dummy"
//! spindle enrich
//! spindle list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite release store |
//! | [`fetch`] | HTTP fetcher with timeout and domain filter |
//! | [`extract`] | Release page scraping |
//! | [`router`] | Attributes crawl responses to releases |
//! | [`covers`] | Cover image files |
//! | [`runlog`] | Enrichment run report |
//! | [`enrich`] | Enrichment run orchestration |
//! | [`catalog`] | Add, list, edit, and tag commands |
//!
//! Domain types, the tag normalizer, the URL builder and the store trait
//! live in the `spindle-core` crate.

pub mod catalog;
pub mod config;
pub mod covers;
pub mod db;
pub mod enrich;
pub mod extract;
pub mod fetch;
pub mod migrate;
pub mod router;
pub mod runlog;
pub mod sqlite_store;
