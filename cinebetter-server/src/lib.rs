//! # Cinebetter Server
//!
//! HTTP front for the Cinebetter metadata gateway. Serves the addon manifest,
//! meta and catalog resources, each optionally behind a settings segment.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
