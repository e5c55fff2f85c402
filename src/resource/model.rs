//! Typed views of the listed resources.
//!
//! Only the attributes needed for pricing and snapshots are decoded; everything
//! else in the provider payload is ignored.

use super::registry::ResourceKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Common view over every listed resource
pub trait Resource {
    const KIND: ResourceKind;

    fn id(&self) -> u64;

    fn name(&self) -> Option<&str>;

    /// Name for reports, `"<kind>-<id>"` when the resource is unnamed
    fn display_name(&self) -> String {
        match self.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}-{}", Self::KIND.slug(), self.id()),
        }
    }
}

/// `{"name": ...}` reference to another object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Datacenter {
    #[serde(default)]
    pub name: Option<String>,
    pub location: NamedRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4 => f.write_str("ipv4"),
            Self::Ipv6 => f.write_str("ipv6"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Server {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub server_type: NamedRef,
    #[serde(default)]
    pub datacenter: Option<Datacenter>,
    /// Non-null when backups are enabled
    #[serde(default)]
    pub backup_window: Option<String>,
}

impl Server {
    pub fn server_type(&self) -> &str {
        &self.server_type.name
    }

    pub fn location(&self) -> Option<&str> {
        self.datacenter.as_ref().map(|dc| dc.location.name.as_str())
    }

    pub fn backups_enabled(&self) -> bool {
        self.backup_window.is_some()
    }
}

impl Resource for Server {
    const KIND: ResourceKind = ResourceKind::Server;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Volume {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// Size in GB
    pub size: u64,
    #[serde(default)]
    pub location: Option<NamedRef>,
}

impl Resource for Volume {
    const KIND: ResourceKind = ResourceKind::Volume;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoadBalancer {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub load_balancer_type: NamedRef,
    #[serde(default)]
    pub location: Option<NamedRef>,
}

impl LoadBalancer {
    pub fn load_balancer_type(&self) -> &str {
        &self.load_balancer_type.name
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.name.as_str())
    }
}

impl Resource for LoadBalancer {
    const KIND: ResourceKind = ResourceKind::LoadBalancer;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PrimaryIp {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub ip: String,
    #[serde(rename = "type")]
    pub family: AddressFamily,
}

impl Resource for PrimaryIp {
    const KIND: ResourceKind = ResourceKind::PrimaryIp;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FloatingIp {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub ip: String,
    #[serde(rename = "type")]
    pub family: AddressFamily,
}

impl Resource for FloatingIp {
    const KIND: ResourceKind = ResourceKind::FloatingIp;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// An image of type `snapshot`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Size in GB; null while the image is still being created
    #[serde(default)]
    pub image_size: Option<Decimal>,
}

impl Snapshot {
    pub fn size_gb(&self) -> Decimal {
        self.image_size.unwrap_or(Decimal::ZERO)
    }
}

impl Resource for Snapshot {
    const KIND: ResourceKind = ResourceKind::Snapshot;

    fn id(&self) -> u64 {
        self.id
    }

    /// Snapshots are usually unnamed; the description is what users set
    fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.description.as_deref())
    }
}

/// Everything the cost report needs, fetched once per run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    pub servers: Vec<Server>,
    pub volumes: Vec<Volume>,
    pub load_balancers: Vec<LoadBalancer>,
    pub primary_ips: Vec<PrimaryIp>,
    pub floating_ips: Vec<FloatingIp>,
    pub snapshots: Vec<Snapshot>,
}

impl Inventory {
    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Server => self.servers.len(),
            ResourceKind::Volume => self.volumes.len(),
            ResourceKind::LoadBalancer => self.load_balancers.len(),
            ResourceKind::PrimaryIp => self.primary_ips.len(),
            ResourceKind::FloatingIp => self.floating_ips.len(),
            ResourceKind::Snapshot => self.snapshots.len(),
        }
    }
}
