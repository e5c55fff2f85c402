//! Monthly cost forecast and fleet-wide snapshots for Hetzner Cloud projects.
//!
//! - [`resource`] - Paginated listing of account resources
//! - [`pricing`] - Price catalog decoding and resolution
//! - [`cost`] - Cost aggregation into a [`cost::CostBreakdown`]
//! - [`snapshot`] - Bulk snapshot creation and action tracking
//! - [`hcloud`] - API transport
//! - [`config`], [`report`], [`error`] - Supporting layers

pub mod config;
pub mod cost;
pub mod error;
pub mod hcloud;
pub mod pricing;
pub mod report;
pub mod resource;
pub mod snapshot;

pub use error::{Error, FetchError, Result};
