//! Price catalog decoding
//!
//! The provider document is decoded once into [`PricingCatalog`]. Each priced
//! kind ends up either flat or per-location; nothing downstream inspects raw
//! JSON again.

use crate::error::FetchError;
use crate::hcloud::client::HcloudClient;
use crate::resource::AddressFamily;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

const DEFAULT_CURRENCY: &str = "EUR";

/// Net (excl. VAT) or gross (incl. VAT) prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Net,
    Gross,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Net => f.write_str("net"),
            Self::Gross => f.write_str("gross"),
        }
    }
}

/// A monthly price in both tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Price {
    pub net: Decimal,
    pub gross: Decimal,
}

impl Price {
    pub fn select(&self, tier: Tier) -> Decimal {
        match tier {
            Tier::Net => self.net,
            Tier::Gross => self.gross,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedPrice {
    pub location: String,
    pub price: Price,
}

/// Price schema of one priced kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum KindPricing {
    Flat(Price),
    /// In catalog order; the first entry is the fallback
    Located(Vec<LocatedPrice>),
}

impl KindPricing {
    fn first(&self) -> Option<&Price> {
        match self {
            Self::Flat(price) => Some(price),
            Self::Located(prices) => prices.first().map(|p| &p.price),
        }
    }
}

// =============================================================================
// Raw provider shapes
// =============================================================================

#[derive(Deserialize)]
struct RawLocatedPrice {
    location: String,
    price_monthly: Price,
}

impl From<RawLocatedPrice> for LocatedPrice {
    fn from(raw: RawLocatedPrice) -> Self {
        Self {
            location: raw.location,
            price: raw.price_monthly,
        }
    }
}

#[derive(Deserialize)]
struct RawTypePricing {
    name: String,
    #[serde(default)]
    prices: Vec<RawLocatedPrice>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlat {
    Monthly { price_monthly: Price },
    PerGb { price_per_gb_month: Price },
}

impl From<RawFlat> for Price {
    fn from(raw: RawFlat) -> Self {
        match raw {
            RawFlat::Monthly { price_monthly } => price_monthly,
            RawFlat::PerGb { price_per_gb_month } => price_per_gb_month,
        }
    }
}

#[derive(Deserialize)]
struct RawFamilyPricing {
    #[serde(rename = "type")]
    family: AddressFamily,
    #[serde(default)]
    prices: Vec<RawLocatedPrice>,
    #[serde(default)]
    price_monthly: Option<Price>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Immutable price catalog for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingCatalog {
    currency: String,
    vat_rate: Option<Decimal>,
    server_types: HashMap<String, KindPricing>,
    load_balancer_types: HashMap<String, KindPricing>,
    primary_ips: HashMap<AddressFamily, KindPricing>,
    volume: Option<KindPricing>,
    snapshot: Option<KindPricing>,
    floating_ip: Option<KindPricing>,
}

impl PricingCatalog {
    /// Fetch and decode the live catalog
    pub async fn fetch(client: &HcloudClient) -> Result<Self, FetchError> {
        let document = client.get_json("pricing", &[]).await?;
        let catalog = Self::from_document(&document)?;
        tracing::info!(
            "Loaded price catalog: {} server types, {} load balancer types ({})",
            catalog.server_types.len(),
            catalog.load_balancer_types.len(),
            catalog.currency
        );
        Ok(catalog)
    }

    /// Decode a catalog document, wrapped in `{"pricing": ...}` or bare
    ///
    /// Sections that do not match the expected schema are logged and treated
    /// as absent, so their prices resolve to zero.
    pub fn from_document(document: &Value) -> Result<Self, FetchError> {
        let pricing = document.get("pricing").unwrap_or(document);
        let Some(sections) = pricing.as_object() else {
            return Err(FetchError::Decode(
                "price catalog is not a JSON object".to_string(),
            ));
        };

        let currency = section::<String>(sections, "currency")
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let vat_rate = section::<Decimal>(sections, "vat_rate");

        let server_types = located_types(sections, "server_types");
        let load_balancer_types = located_types(sections, "load_balancer_types");

        let mut primary_ips = HashMap::new();
        for raw in section_entries::<RawFamilyPricing>(sections, "primary_ips") {
            // Primary IPs are billed per family; a per-location list collapses to its first entry
            let price = match (raw.price_monthly, raw.prices.into_iter().next()) {
                (Some(price), _) => price,
                (None, Some(first)) => first.price_monthly,
                (None, None) => {
                    tracing::warn!("Primary IP family {} has no price", raw.family);
                    continue;
                }
            };
            primary_ips.entry(raw.family).or_insert(KindPricing::Flat(price));
        }

        let flat = |key: &str| section::<RawFlat>(sections, key).map(|raw| KindPricing::Flat(raw.into()));

        Ok(Self {
            currency,
            vat_rate,
            server_types,
            load_balancer_types,
            primary_ips,
            volume: flat("volume"),
            snapshot: flat("image"),
            floating_ip: flat("floating_ip"),
        })
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn vat_rate(&self) -> Option<Decimal> {
        self.vat_rate
    }

    pub fn server_type(&self, name: &str) -> Option<&KindPricing> {
        self.server_types.get(name)
    }

    pub fn load_balancer_type(&self, name: &str) -> Option<&KindPricing> {
        self.load_balancer_types.get(name)
    }

    pub fn primary_ip(&self, family: AddressFamily) -> Option<&Price> {
        self.primary_ips.get(&family).and_then(KindPricing::first)
    }

    pub fn volume_per_gb(&self) -> Option<&Price> {
        self.volume.as_ref().and_then(KindPricing::first)
    }

    pub fn snapshot_per_gb(&self) -> Option<&Price> {
        self.snapshot.as_ref().and_then(KindPricing::first)
    }

    pub fn floating_ip(&self) -> Option<&Price> {
        self.floating_ip.as_ref().and_then(KindPricing::first)
    }
}

fn located_types(sections: &Map<String, Value>, key: &str) -> HashMap<String, KindPricing> {
    let mut types = HashMap::new();
    for raw in section_entries::<RawTypePricing>(sections, key) {
        let prices = raw.prices.into_iter().map(LocatedPrice::from).collect();
        types
            .entry(raw.name)
            .or_insert(KindPricing::Located(prices));
    }
    types
}

/// Decode one top-level section, `None` if absent, null or malformed
fn section<T: DeserializeOwned>(sections: &Map<String, Value>, key: &str) -> Option<T> {
    let value = sections.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Ignoring malformed price catalog section '{}': {}", key, e);
            None
        }
    }
}

/// Decode a list section entry by entry, skipping malformed entries
fn section_entries<T: DeserializeOwned>(sections: &Map<String, Value>, key: &str) -> Vec<T> {
    let Some(entries) = section::<Vec<Value>>(sections, key) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Ignoring malformed entry {} of '{}': {}", idx, key, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_document() -> Value {
        json!({
            "pricing": {
                "currency": "EUR",
                "vat_rate": "19.00",
                "image": {"price_per_gb_month": {"net": "0.0119", "gross": "0.0142"}},
                "volume": {"price_per_gb_month": {"net": "0.0440", "gross": "0.0524"}},
                "floating_ip": {"price_monthly": {"net": "3.00", "gross": "3.57"}},
                "server_backup": {"percentage": "20.0000000000"},
                "primary_ips": [
                    {"type": "ipv4", "prices": [
                        {"location": "fsn1", "price_hourly": {"net": "0.0008", "gross": "0.00095"},
                         "price_monthly": {"net": "0.50", "gross": "0.595"}},
                        {"location": "ash", "price_monthly": {"net": "0.60", "gross": "0.714"}}
                    ]},
                    {"type": "ipv6", "prices": [
                        {"location": "fsn1", "price_monthly": {"net": "0.00", "gross": "0.00"}}
                    ]}
                ],
                "server_types": [
                    {"id": 1, "name": "cx11", "prices": [
                        {"location": "fsn1", "price_monthly": {"net": "3.29", "gross": "3.92"}},
                        {"location": "nbg1", "price_monthly": {"net": "3.49", "gross": "4.15"}}
                    ]}
                ],
                "load_balancer_types": [
                    {"id": 1, "name": "lb11", "prices": [
                        {"location": "fsn1", "price_monthly": {"net": "5.39", "gross": "6.41"}}
                    ]}
                ]
            }
        })
    }

    #[test]
    fn test_decodes_provider_catalog() {
        let catalog = PricingCatalog::from_document(&sample_document()).unwrap();

        assert_eq!(catalog.currency(), "EUR");
        assert_eq!(catalog.vat_rate(), Some(dec!(19.00)));
        assert_eq!(catalog.volume_per_gb().unwrap().net, dec!(0.0440));
        assert_eq!(catalog.snapshot_per_gb().unwrap().gross, dec!(0.0142));
        assert_eq!(catalog.floating_ip().unwrap().net, dec!(3.00));

        match catalog.server_type("cx11").unwrap() {
            KindPricing::Located(prices) => {
                assert_eq!(prices.len(), 2);
                assert_eq!(prices[0].location, "fsn1");
                assert_eq!(prices[1].price.gross, dec!(4.15));
            }
            other => panic!("expected located pricing, got {other:?}"),
        }
    }

    #[test]
    fn test_primary_ip_list_collapses_to_first_entry() {
        let catalog = PricingCatalog::from_document(&sample_document()).unwrap();
        assert_eq!(catalog.primary_ip(AddressFamily::Ipv4).unwrap().net, dec!(0.50));
        assert_eq!(catalog.primary_ip(AddressFamily::Ipv6).unwrap().net, dec!(0.00));
    }

    #[test]
    fn test_flat_primary_ip_shape_is_accepted() {
        let catalog = PricingCatalog::from_document(&json!({
            "primary_ips": [{"type": "ipv4", "price_monthly": {"net": 0.6, "gross": 0.71}}]
        }))
        .unwrap();
        assert_eq!(catalog.primary_ip(AddressFamily::Ipv4).unwrap().net, dec!(0.6));
        assert!(catalog.primary_ip(AddressFamily::Ipv6).is_none());
    }

    #[test]
    fn test_bare_document_and_defaults() {
        let catalog = PricingCatalog::from_document(&json!({})).unwrap();
        assert_eq!(catalog.currency(), "EUR");
        assert!(catalog.volume_per_gb().is_none());
        assert!(catalog.server_type("cx11").is_none());
    }

    #[test]
    fn test_malformed_sections_are_dropped_not_fatal() {
        let catalog = PricingCatalog::from_document(&json!({
            "pricing": {
                "volume": {"unexpected": true},
                "image": "free",
                "server_types": [
                    {"name": "broken", "prices": [{"location": "fsn1"}]},
                    {"name": "cx22", "prices": [
                        {"location": "fsn1", "price_monthly": {"net": "3.79", "gross": "4.51"}}
                    ]}
                ]
            }
        }))
        .unwrap();

        assert!(catalog.volume_per_gb().is_none());
        assert!(catalog.snapshot_per_gb().is_none());
        assert!(catalog.server_type("broken").is_none());
        assert!(catalog.server_type("cx22").is_some());
    }

    #[test]
    fn test_non_object_document_is_an_error() {
        assert!(PricingCatalog::from_document(&json!([1, 2, 3])).is_err());
        assert!(PricingCatalog::from_document(&json!({"pricing": "n/a"})).is_err());
    }

    #[test]
    fn test_tier_selection() {
        let price = Price {
            net: dec!(3.00),
            gross: dec!(3.57),
        };
        assert_eq!(price.select(Tier::Net), dec!(3.00));
        assert_eq!(price.select(Tier::Gross), dec!(3.57));
    }
}
