//! Resource abstraction layer
//!
//! # Architecture
//!
//! - [`registry`] - Resource kinds and their listing endpoints
//! - [`model`] - Typed resources decoded from listing pages
//! - [`fetcher`] - Fetches complete listings with pagination support
//!
//! # Example
//!
//! ```ignore
//! use hcfleet::resource::{fetch_resources, Server};
//!
//! async fn list_servers(client: &HcloudClient) -> hcfleet::Result<Vec<Server>> {
//!     fetch_resources::<Server>(client, 50).await
//! }
//! ```

pub mod fetcher;
pub mod model;
pub mod registry;

pub use fetcher::{fetch_all_raw, fetch_inventory, fetch_page, fetch_resources, PaginatedResult, MAX_PAGE_SIZE};
pub use model::*;
pub use registry::{ListEndpoint, ResourceKind};
