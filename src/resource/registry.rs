//! Resource Registry - listing endpoints per resource kind
//!
//! Every kind the tool reads is described by a static [`ListEndpoint`] so the
//! fetcher never needs per-kind code.

use serde::Serialize;
use std::fmt;

/// Kinds of resources read from the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Server,
    Volume,
    LoadBalancer,
    PrimaryIp,
    FloatingIp,
    Snapshot,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Server,
        ResourceKind::Volume,
        ResourceKind::LoadBalancer,
        ResourceKind::PrimaryIp,
        ResourceKind::FloatingIp,
        ResourceKind::Snapshot,
    ];

    /// Prefix used for synthesized display names (`server-42`)
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Volume => "volume",
            Self::LoadBalancer => "load-balancer",
            Self::PrimaryIp => "primary-ip",
            Self::FloatingIp => "floating-ip",
            Self::Snapshot => "snapshot",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Server => "Servers",
            Self::Volume => "Volumes",
            Self::LoadBalancer => "Load Balancers",
            Self::PrimaryIp => "Primary IPs",
            Self::FloatingIp => "Floating IPs",
            Self::Snapshot => "Snapshots",
        }
    }

    pub fn endpoint(&self) -> &'static ListEndpoint {
        match self {
            Self::Server => &SERVERS,
            Self::Volume => &VOLUMES,
            Self::LoadBalancer => &LOAD_BALANCERS,
            Self::PrimaryIp => &PRIMARY_IPS,
            Self::FloatingIp => &FLOATING_IPS,
            Self::Snapshot => &SNAPSHOTS,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A cursor-paginated listing endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEndpoint {
    /// Path relative to the API root
    pub path: &'static str,
    /// Key of the item array in each page
    pub items_key: &'static str,
    /// Fixed query parameters sent with every page
    pub query: &'static [(&'static str, &'static str)],
    /// A failed fetch degrades to an empty list instead of aborting the run
    pub optional: bool,
}

pub const SERVERS: ListEndpoint = ListEndpoint {
    path: "servers",
    items_key: "servers",
    query: &[],
    optional: false,
};

pub const VOLUMES: ListEndpoint = ListEndpoint {
    path: "volumes",
    items_key: "volumes",
    query: &[],
    optional: false,
};

pub const LOAD_BALANCERS: ListEndpoint = ListEndpoint {
    path: "load_balancers",
    items_key: "load_balancers",
    query: &[],
    optional: false,
};

pub const PRIMARY_IPS: ListEndpoint = ListEndpoint {
    path: "primary_ips",
    items_key: "primary_ips",
    query: &[],
    optional: false,
};

/// Legacy kind: projects without the feature answer with an error.
pub const FLOATING_IPS: ListEndpoint = ListEndpoint {
    path: "floating_ips",
    items_key: "floating_ips",
    query: &[],
    optional: true,
};

pub const SNAPSHOTS: ListEndpoint = ListEndpoint {
    path: "images",
    items_key: "images",
    query: &[("type", "snapshot")],
    optional: false,
};
