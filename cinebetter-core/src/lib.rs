//! # Cinebetter Core
//!
//! Core library for the Cinebetter metadata gateway: IMDb titles reshaped into
//! Stremio meta items, cross-referenced against TMDB and served from a
//! stale-while-revalidate response cache.
//!
//! ## Overview
//!
//! - [`cache`]: response cache with pluggable backends (on-disk, Redis, no-op)
//!   and the [`ResponseCache::with_cache`](cache::ResponseCache::with_cache)
//!   control flow
//! - [`settings`]: the per-client settings token carried in addon URLs
//! - [`providers`]: IMDb GraphQL and TMDB clients behind traits
//! - [`episodes`]: cursor pagination and season normalization for episodes
//! - [`identity`]: IMDb to TMDB resolution with a persistent memo
//! - [`projection`]: raw titles to published meta items
//! - [`service`]: meta and catalog lookups composed from the above

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod cache;
pub mod catalog;
pub mod episodes;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod projection;
pub mod providers;
pub mod request;
pub mod service;
pub mod settings;
pub mod title;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{GatewayError, Result};
pub use request::RequestContext;
pub use service::MetadataService;
pub use settings::{LanguageCode, UserSettings};
