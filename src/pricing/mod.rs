//! Price catalog and resolution
//!
//! - [`catalog`] - Decodes the provider price document into a tagged schema
//! - [`resolver`] - Answers (kind, location, tier) queries with a fallback policy

pub mod catalog;
pub mod resolver;

pub use catalog::{KindPricing, LocatedPrice, Price, PricingCatalog, Tier};
pub use resolver::{resolve, PriceKey, PriceQuery, PriceSource, Resolution};
