//! Resource Fetcher
//!
//! Walks cursor-paginated listings until the provider stops advertising a
//! next page.

use super::model::{FloatingIp, Inventory, LoadBalancer, PrimaryIp, Resource, Server, Snapshot, Volume};
use super::registry::{ListEndpoint, ResourceKind};
use crate::error::{Error, FetchError, Result};
use crate::hcloud::client::HcloudClient;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Largest page the API accepts
pub const MAX_PAGE_SIZE: u32 = 50;

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_page: Option<u64>,
}

/// Fetch one page of an endpoint
pub async fn fetch_page(
    client: &HcloudClient,
    endpoint: &ListEndpoint,
    page: u64,
    per_page: u32,
) -> std::result::Result<PaginatedResult, FetchError> {
    let mut query: Vec<(&str, String)> = endpoint
        .query
        .iter()
        .map(|(k, v)| (*k, v.to_string()))
        .collect();
    query.push(("page", page.to_string()));
    query.push(("per_page", per_page.to_string()));

    let mut response = client.get_json(endpoint.path, &query).await?;

    let items = match response.get_mut(endpoint.items_key).map(Value::take) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(FetchError::Decode(format!(
                "'{}' is not an array but {}",
                endpoint.items_key,
                json_type_name(&other)
            )))
        }
    };

    // A missing meta block means there is nothing beyond this page
    let next_page = response
        .get("meta")
        .and_then(|m| m.get("pagination"))
        .and_then(|p| p.get("next_page"))
        .and_then(|n| n.as_u64());

    Ok(PaginatedResult { items, next_page })
}

/// Fetch all items of an endpoint (auto-paginate), in listing order
pub async fn fetch_all_raw(
    client: &HcloudClient,
    endpoint: &ListEndpoint,
    page_size: u32,
) -> std::result::Result<Vec<Value>, FetchError> {
    let per_page = page_size.clamp(1, MAX_PAGE_SIZE);
    let mut all_items = Vec::new();
    let mut page = 1;

    loop {
        let result = fetch_page(client, endpoint, page, per_page).await?;
        let received = result.items.len();
        all_items.extend(result.items);

        tracing::debug!(
            "{} page {}: {} items (next: {:?})",
            endpoint.path,
            page,
            received,
            result.next_page
        );

        match result.next_page {
            Some(next) if received > 0 => {
                if next <= page {
                    return Err(FetchError::Decode(format!(
                        "pagination went backwards on {} ({} -> {})",
                        endpoint.path, page, next
                    )));
                }
                page = next;
            }
            _ => break,
        }
    }

    Ok(all_items)
}

/// Fetch and decode every resource of kind `T`
///
/// Failures are fatal unless the endpoint is optional, in which case they
/// degrade to an empty list.
pub async fn fetch_resources<T>(client: &HcloudClient, page_size: u32) -> Result<Vec<T>>
where
    T: Resource + DeserializeOwned,
{
    let endpoint = T::KIND.endpoint();

    let decoded = match fetch_all_raw(client, endpoint, page_size).await {
        Ok(items) => items
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(FetchError::from),
        Err(e) => Err(e),
    };

    match decoded {
        Ok(resources) => {
            tracing::info!("Fetched {} {}", resources.len(), T::KIND.display_name());
            Ok(resources)
        }
        Err(e) if endpoint.optional => {
            tracing::warn!(
                "Failed to fetch optional {}: {}, treating as none",
                T::KIND.display_name(),
                e
            );
            Ok(Vec::new())
        }
        Err(e) => Err(Error::fetch(T::KIND.display_name(), e)),
    }
}

/// Fetch every kind the cost report needs
pub async fn fetch_inventory(client: &HcloudClient, page_size: u32) -> Result<Inventory> {
    let (servers, volumes, load_balancers, primary_ips, floating_ips, snapshots) = tokio::try_join!(
        fetch_resources::<Server>(client, page_size),
        fetch_resources::<Volume>(client, page_size),
        fetch_resources::<LoadBalancer>(client, page_size),
        fetch_resources::<PrimaryIp>(client, page_size),
        fetch_resources::<FloatingIp>(client, page_size),
        fetch_resources::<Snapshot>(client, page_size),
    )?;

    let inventory = Inventory {
        servers,
        volumes,
        load_balancers,
        primary_ips,
        floating_ips,
        snapshots,
    };

    for kind in ResourceKind::ALL {
        tracing::debug!("inventory {}: {}", kind, inventory.count(kind));
    }

    Ok(inventory)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_type_names() {
        assert_eq!(json_type_name(&json!({})), "an object");
        assert_eq!(json_type_name(&json!("x")), "a string");
        assert_eq!(json_type_name(&json!(1)), "a number");
    }
}
