//! Cost aggregation
//!
//! Combines an [`Inventory`] with a [`PricingCatalog`] into a [`CostBreakdown`].
//! Everything here is pure: the same inputs always give the same breakdown.
//!
//! All sums are exact [`Decimal`] arithmetic. Rounding to display precision is
//! left to the report layer.

use crate::pricing::{resolve, PriceKey, PriceQuery, PriceSource, PricingCatalog, Resolution, Tier};
use crate::resource::{Inventory, Resource, ResourceKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// Backup add-on, as a share of the server's monthly price (20%)
pub const BACKUP_SURCHARGE_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// One priced resource instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub id: u64,
    pub name: String,
    /// Type/location, size or address, depending on the kind
    pub detail: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// `quantity * unit_price`
    pub amount: Decimal,
    /// Backup add-on for servers with backups enabled; not part of `amount`
    pub surcharge: Option<Decimal>,
    pub source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCost {
    pub kind: ResourceKind,
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

impl KindCost {
    fn new(kind: ResourceKind, items: Vec<LineItem>) -> Self {
        let total = items.iter().map(|i| i.amount).sum();
        Self { kind, items, total }
    }
}

/// Monthly cost of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub currency: String,
    pub tier: Tier,
    /// VAT percentage the catalog's gross prices include
    pub vat_rate: Option<Decimal>,
    pub kinds: Vec<KindCost>,
    pub backups_total: Decimal,
    pub total: Decimal,
}

impl CostBreakdown {
    pub fn kind(&self, kind: ResourceKind) -> Option<&KindCost> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    /// Total for a kind, zero when the kind is not part of the breakdown
    pub fn kind_total(&self, kind: ResourceKind) -> Decimal {
        self.kind(kind).map(|k| k.total).unwrap_or(Decimal::ZERO)
    }

    pub fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.kinds.iter().flat_map(|k| k.items.iter())
    }

    /// Line items priced by fallback or not priced at all
    pub fn approximate_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items()
            .filter(|i| matches!(i.source, PriceSource::Fallback | PriceSource::Missing))
    }

    /// Check the summation invariants
    pub fn is_consistent(&self) -> bool {
        let kinds_ok = self
            .kinds
            .iter()
            .all(|k| k.total == k.items.iter().map(|i| i.amount).sum::<Decimal>());
        let backups: Decimal = self.items().filter_map(|i| i.surcharge).sum();
        let kinds_total: Decimal = self.kinds.iter().map(|k| k.total).sum();

        kinds_ok && backups == self.backups_total && self.total == kinds_total + self.backups_total
    }
}

/// Aggregate the monthly cost of `inventory`
pub fn aggregate(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> CostBreakdown {
    let mut kinds = vec![
        servers(inventory, catalog, tier),
        volumes(inventory, catalog, tier),
        load_balancers(inventory, catalog, tier),
        primary_ips(inventory, catalog, tier),
    ];
    // Legacy kind, only reported for accounts that still have some
    if !inventory.floating_ips.is_empty() {
        kinds.push(floating_ips(inventory, catalog, tier));
    }
    kinds.push(snapshots(inventory, catalog, tier));

    let backups_total: Decimal = kinds
        .iter()
        .flat_map(|k| k.items.iter())
        .filter_map(|i| i.surcharge)
        .sum();
    let total = kinds.iter().map(|k| k.total).sum::<Decimal>() + backups_total;

    tracing::info!(
        "Aggregated {} line items: total {} {} ({})",
        kinds.iter().map(|k| k.items.len()).sum::<usize>(),
        total,
        catalog.currency(),
        tier
    );

    CostBreakdown {
        currency: catalog.currency().to_string(),
        tier,
        vat_rate: catalog.vat_rate(),
        kinds,
        backups_total,
        total,
    }
}

/// Resolve and log resolution gaps
fn price<R: Resource>(
    catalog: &PricingCatalog,
    resource: &R,
    key: PriceKey<'_>,
    location: Option<&str>,
    tier: Tier,
) -> Resolution {
    let resolution = resolve(catalog, &PriceQuery::new(key, location, tier));
    match &resolution {
        Resolution::NotFound => tracing::warn!(
            "No price for {} ({:?}), counting it as 0",
            resource.display_name(),
            key
        ),
        Resolution::Fallback { listed_location, .. } => tracing::debug!(
            "{}: no price for {:?} in {:?}, using {}",
            resource.display_name(),
            key,
            location,
            listed_location
        ),
        _ => {}
    }
    resolution
}

fn line_item<R: Resource>(
    resource: &R,
    detail: String,
    quantity: Decimal,
    resolution: &Resolution,
) -> LineItem {
    let unit_price = resolution.amount();
    LineItem {
        id: resource.id(),
        name: resource.display_name(),
        detail,
        quantity,
        unit_price,
        amount: quantity * unit_price,
        surcharge: None,
        source: resolution.source(),
    }
}

fn servers(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> KindCost {
    let items = inventory
        .servers
        .iter()
        .map(|server| {
            let key = PriceKey::ServerType(server.server_type());
            let resolution = price(catalog, server, key, server.location(), tier);
            let detail = format!(
                "{} @ {}",
                server.server_type(),
                server.location().unwrap_or("-")
            );
            let mut item = line_item(server, detail, Decimal::ONE, &resolution);
            if server.backups_enabled() {
                item.surcharge = Some(item.amount * BACKUP_SURCHARGE_RATE);
            }
            item
        })
        .collect();

    KindCost::new(ResourceKind::Server, items)
}

fn volumes(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> KindCost {
    let items = inventory
        .volumes
        .iter()
        .map(|volume| {
            let resolution = price(catalog, volume, PriceKey::Volume, None, tier);
            line_item(
                volume,
                format!("{} GB", volume.size),
                Decimal::from(volume.size),
                &resolution,
            )
        })
        .collect();

    KindCost::new(ResourceKind::Volume, items)
}

fn load_balancers(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> KindCost {
    let items = inventory
        .load_balancers
        .iter()
        .map(|lb| {
            let key = PriceKey::LoadBalancerType(lb.load_balancer_type());
            let resolution = price(catalog, lb, key, lb.location(), tier);
            let detail = format!(
                "{} @ {}",
                lb.load_balancer_type(),
                lb.location().unwrap_or("-")
            );
            line_item(lb, detail, Decimal::ONE, &resolution)
        })
        .collect();

    KindCost::new(ResourceKind::LoadBalancer, items)
}

fn primary_ips(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> KindCost {
    let mut ips: Vec<_> = inventory.primary_ips.iter().collect();
    // Group by family so the breakdown reads as count x rate per family
    ips.sort_by_key(|ip| ip.family);

    let items = ips
        .into_iter()
        .map(|ip| {
            let resolution = price(catalog, ip, PriceKey::PrimaryIp(ip.family), None, tier);
            line_item(ip, format!("{} {}", ip.family, ip.ip), Decimal::ONE, &resolution)
        })
        .collect();

    KindCost::new(ResourceKind::PrimaryIp, items)
}

fn floating_ips(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> KindCost {
    let items = inventory
        .floating_ips
        .iter()
        .map(|ip| {
            let resolution = price(catalog, ip, PriceKey::FloatingIp, None, tier);
            line_item(ip, format!("{} {}", ip.family, ip.ip), Decimal::ONE, &resolution)
        })
        .collect();

    KindCost::new(ResourceKind::FloatingIp, items)
}

fn snapshots(inventory: &Inventory, catalog: &PricingCatalog, tier: Tier) -> KindCost {
    let items = inventory
        .snapshots
        .iter()
        .map(|snapshot| {
            let resolution = price(catalog, snapshot, PriceKey::Snapshot, None, tier);
            line_item(
                snapshot,
                format!("{} GB", snapshot.size_gb()),
                snapshot.size_gb(),
                &resolution,
            )
        })
        .collect();

    KindCost::new(ResourceKind::Snapshot, items)
}
