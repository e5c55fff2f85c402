//! Hetzner Cloud API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Client bound to an endpoint and a bearer token
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use hcfleet::hcloud::client::{HcloudClient, DEFAULT_API_URL};
//!
//! async fn example(token: &str) -> anyhow::Result<()> {
//!     let client = HcloudClient::new(DEFAULT_API_URL, token)?;
//!     let pricing = client.get_json("pricing", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
