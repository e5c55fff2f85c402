//! Price resolution against a [`PricingCatalog`].

use super::catalog::{KindPricing, Price, PricingCatalog, Tier};
use crate::resource::AddressFamily;
use rust_decimal::Decimal;
use serde::Serialize;

/// What is being priced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceKey<'a> {
    ServerType(&'a str),
    LoadBalancerType(&'a str),
    /// Per GB and month
    Volume,
    PrimaryIp(AddressFamily),
    FloatingIp,
    /// Per GB and month
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuery<'a> {
    pub key: PriceKey<'a>,
    pub location: Option<&'a str>,
    pub tier: Tier,
}

impl<'a> PriceQuery<'a> {
    pub fn new(key: PriceKey<'a>, location: Option<&'a str>, tier: Tier) -> Self {
        Self { key, location, tier }
    }
}

/// How a price was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Exact,
    Fallback,
    Flat,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Listed for the requested location
    Exact(Decimal),
    /// First listed entry, used because the location had no entry
    Fallback { amount: Decimal, listed_location: String },
    /// Location-independent price
    Flat(Decimal),
    /// No catalog data; counts as zero
    NotFound,
}

impl Resolution {
    /// Effective amount, zero when nothing was found
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Exact(amount) | Self::Flat(amount) => *amount,
            Self::Fallback { amount, .. } => *amount,
            Self::NotFound => Decimal::ZERO,
        }
    }

    pub fn source(&self) -> PriceSource {
        match self {
            Self::Exact(_) => PriceSource::Exact,
            Self::Fallback { .. } => PriceSource::Fallback,
            Self::Flat(_) => PriceSource::Flat,
            Self::NotFound => PriceSource::Missing,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Resolve the recurring monthly price for `query`
pub fn resolve(catalog: &PricingCatalog, query: &PriceQuery<'_>) -> Resolution {
    let tier = query.tier;

    match query.key {
        PriceKey::ServerType(name) => {
            located(catalog.server_type(name), query.location, tier)
        }
        PriceKey::LoadBalancerType(name) => {
            located(catalog.load_balancer_type(name), query.location, tier)
        }
        PriceKey::Volume => flat(catalog.volume_per_gb(), tier),
        PriceKey::PrimaryIp(family) => flat(catalog.primary_ip(family), tier),
        PriceKey::FloatingIp => flat(catalog.floating_ip(), tier),
        PriceKey::Snapshot => flat(catalog.snapshot_per_gb(), tier),
    }
}

fn located(pricing: Option<&KindPricing>, location: Option<&str>, tier: Tier) -> Resolution {
    match pricing {
        None => Resolution::NotFound,
        Some(KindPricing::Flat(price)) => Resolution::Flat(price.select(tier)),
        Some(KindPricing::Located(prices)) => {
            let exact = location.and_then(|loc| prices.iter().find(|p| p.location == loc));
            if let Some(entry) = exact {
                return Resolution::Exact(entry.price.select(tier));
            }
            match prices.first() {
                Some(first) => Resolution::Fallback {
                    amount: first.price.select(tier),
                    listed_location: first.location.clone(),
                },
                None => Resolution::NotFound,
            }
        }
    }
}

fn flat(price: Option<&Price>, tier: Tier) -> Resolution {
    match price {
        Some(price) => Resolution::Flat(price.select(tier)),
        None => Resolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn catalog() -> PricingCatalog {
        PricingCatalog::from_document(&json!({
            "pricing": {
                "volume": {"price_per_gb_month": {"net": "0.02", "gross": "0.0238"}},
                "primary_ips": [
                    {"type": "ipv4", "prices": [{"location": "fsn1", "price_monthly": {"net": "0.60", "gross": "0.714"}}]},
                    {"type": "ipv6", "prices": [{"location": "fsn1", "price_monthly": {"net": "0.00", "gross": "0.00"}}]}
                ],
                "server_types": [
                    {"name": "cx11", "prices": [
                        {"location": "fsn1", "price_monthly": {"net": "3.00", "gross": "3.57"}}
                    ]},
                    {"name": "cpx21", "prices": [
                        {"location": "fsn1", "price_monthly": {"net": "7.55", "gross": "8.98"}},
                        {"location": "hel1", "price_monthly": {"net": "7.05", "gross": "8.39"}}
                    ]},
                    {"name": "retired", "prices": []}
                ],
                "load_balancer_types": [
                    {"name": "lb11", "prices": [
                        {"location": "nbg1", "price_monthly": {"net": "5.39", "gross": "6.41"}}
                    ]}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_exact_location_is_preferred() {
        let catalog = catalog();
        let query = PriceQuery::new(PriceKey::ServerType("cpx21"), Some("hel1"), Tier::Net);
        assert_eq!(resolve(&catalog, &query), Resolution::Exact(dec!(7.05)));

        let gross = PriceQuery::new(PriceKey::ServerType("cpx21"), Some("hel1"), Tier::Gross);
        assert_eq!(resolve(&catalog, &gross).amount(), dec!(8.39));
    }

    #[test]
    fn test_unlisted_location_falls_back_to_first_entry() {
        let catalog = catalog();
        let query = PriceQuery::new(PriceKey::ServerType("cx11"), Some("nbg1"), Tier::Net);
        let resolution = resolve(&catalog, &query);

        assert_eq!(
            resolution,
            Resolution::Fallback {
                amount: dec!(3.00),
                listed_location: "fsn1".to_string()
            }
        );
        assert_eq!(resolution.source(), PriceSource::Fallback);
    }

    #[test]
    fn test_missing_location_uses_fallback() {
        let catalog = catalog();
        let query = PriceQuery::new(PriceKey::LoadBalancerType("lb11"), None, Tier::Net);
        assert_eq!(resolve(&catalog, &query).amount(), dec!(5.39));
    }

    #[test]
    fn test_unknown_or_unpriced_type_is_not_found() {
        let catalog = catalog();
        for name in ["cx99", "retired"] {
            let query = PriceQuery::new(PriceKey::ServerType(name), Some("fsn1"), Tier::Net);
            let resolution = resolve(&catalog, &query);
            assert_eq!(resolution, Resolution::NotFound);
            assert_eq!(resolution.amount(), Decimal::ZERO);
        }
    }

    #[test]
    fn test_location_independent_kinds_ignore_location() {
        let catalog = catalog();
        for location in [None, Some("fsn1"), Some("nowhere")] {
            let volume = PriceQuery::new(PriceKey::Volume, location, Tier::Net);
            assert_eq!(resolve(&catalog, &volume), Resolution::Flat(dec!(0.02)));

            let ipv4 = PriceQuery::new(PriceKey::PrimaryIp(AddressFamily::Ipv4), location, Tier::Net);
            assert_eq!(resolve(&catalog, &ipv4), Resolution::Flat(dec!(0.60)));
        }
    }

    #[test]
    fn test_absent_flat_price_is_zero_not_error() {
        let catalog = catalog();
        let snapshot = PriceQuery::new(PriceKey::Snapshot, None, Tier::Net);
        let floating = PriceQuery::new(PriceKey::FloatingIp, None, Tier::Gross);

        assert_eq!(resolve(&catalog, &snapshot), Resolution::NotFound);
        assert_eq!(resolve(&catalog, &floating).amount(), Decimal::ZERO);
    }
}
