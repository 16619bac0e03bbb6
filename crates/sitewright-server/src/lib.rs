//! HTTP API for sitewright.
//!
//! Serves template administration and site creation endpoints, plus the
//! generated sites, uploaded images and template slots as static files.

mod admin;
mod error;
mod form;
pub mod server;
mod sites;
pub mod state;

pub use error::ApiError;
pub use server::{router, ServerConfig, ServerError, SiteServer};
pub use state::{AppState, StoragePaths};
