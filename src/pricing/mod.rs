//! Pricing resolver
//!
//! Live-API-first, static-fallback-second unit-price lookup with an
//! in-process cache keyed by `(kind, region, attribute_signature)`. One
//! resolver instance is constructed per run and shared by every scanner —
//! the cache is the dominant cost-control for the Price List API.
//!
//! Attribute signatures are plain strings, built by the scanners:
//! - compute:       `<instance_type>/<os>` (e.g. `t3.micro/Linux`)
//! - volume:        `<volume_type>` (e.g. `gp3`)
//! - database:      `<class>/<engine>/<single-az|multi-az>`, or `snapshot`
//! - object store:  `<storage_class>` (e.g. `STANDARD`)

pub mod cost;
pub mod fallback;

use crate::error::{Result, WastectlError};
use crate::model::{PriceQuote, PriceSource, ResourceKind};
use crate::provider::PricingSource;
use chrono::Utc;
use fallback::StaticPriceTable;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

type CacheKey = (ResourceKind, String, String);

/// Per-run price lookup with caching and fallback.
pub struct PricingResolver {
    live: Option<Arc<dyn PricingSource>>,
    fallback: StaticPriceTable,
    // Held across the whole check-fetch-store sequence so concurrent
    // lookups for the same key trigger at most one live call.
    cache: Mutex<HashMap<CacheKey, PriceQuote>>,
}

impl PricingResolver {
    /// Resolver backed by a live pricing source with static fallback.
    pub fn new(live: Arc<dyn PricingSource>) -> Self {
        Self {
            live: Some(live),
            fallback: StaticPriceTable,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolver that only uses the static table (offline / `--static-pricing`).
    pub fn static_only() -> Self {
        Self {
            live: None,
            fallback: StaticPriceTable,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the unit prices for one key.
    ///
    /// Never errors for "live source is down" — any live failure falls back
    /// to the static table. The only hard failure is `PricingUnavailable`,
    /// when neither source knows the key.
    pub async fn get_unit_price(
        &self,
        kind: ResourceKind,
        region: &str,
        signature: &str,
    ) -> Result<PriceQuote> {
        let key: CacheKey = (kind, region.to_string(), signature.to_string());

        let mut cache = self.cache.lock().await;
        if let Some(quote) = cache.get(&key) {
            debug!(kind = %kind, signature, "price cache hit");
            return Ok(quote.clone());
        }

        let quote = match self.fetch_live(kind, region, signature).await {
            Some(quote) => quote,
            None => {
                let dims = self.fallback.dimensions(kind, signature).ok_or_else(|| {
                    WastectlError::PricingUnavailable {
                        kind,
                        region: region.to_string(),
                        signature: signature.to_string(),
                    }
                })?;
                PriceQuote {
                    resource_kind: kind,
                    region: region.to_string(),
                    dimensions: dims,
                    source: PriceSource::StaticFallback,
                    fetched_at: Utc::now(),
                }
            }
        };

        cache.insert(key, quote.clone());
        Ok(quote)
    }

    /// Query the live source and normalize its document. Returns `None` on
    /// any failure — caught here, never propagated.
    async fn fetch_live(
        &self,
        kind: ResourceKind,
        region: &str,
        signature: &str,
    ) -> Option<PriceQuote> {
        let live = self.live.as_ref()?;
        match live.query_price(kind, region, signature).await {
            Ok(doc) => {
                let unit_price = extract_usd_price(&doc)?;
                let mut dimensions = self.fallback.secondary_dimensions(kind, signature);
                dimensions.insert(
                    StaticPriceTable::primary_dimension(kind).to_string(),
                    unit_price,
                );
                debug!(kind = %kind, signature, unit_price, "live price fetched");
                Some(PriceQuote {
                    resource_kind: kind,
                    region: region.to_string(),
                    dimensions,
                    source: PriceSource::LiveApi,
                    fetched_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!(kind = %kind, signature, "live pricing failed, using static table: {}", e);
                None
            }
        }
    }
}

/// Walk a Price List product document (or an array of them) down to the
/// first positive on-demand USD price:
/// `terms.OnDemand.*.priceDimensions.*.pricePerUnit.USD`.
fn extract_usd_price(doc: &serde_json::Value) -> Option<f64> {
    if let Some(products) = doc.as_array() {
        return products.iter().find_map(extract_usd_price);
    }

    let on_demand = doc.get("terms")?.get("OnDemand")?.as_object()?;
    for term in on_demand.values() {
        let Some(price_dimensions) = term.get("priceDimensions").and_then(|d| d.as_object()) else {
            continue;
        };
        for dimension in price_dimensions.values() {
            let usd = dimension
                .get("pricePerUnit")
                .and_then(|p| p.get("USD"))
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<f64>().ok());
            if let Some(price) = usd {
                if price > 0.0 {
                    return Some(price);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(price: &str) -> serde_json::Value {
        json!({
            "product": {"productFamily": "Storage"},
            "terms": {
                "OnDemand": {
                    "ABC.123": {
                        "priceDimensions": {
                            "ABC.123.XYZ": {
                                "unit": "GB-Mo",
                                "pricePerUnit": {"USD": price}
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_extract_usd_price_from_nested_document() {
        assert_eq!(extract_usd_price(&product("0.0800000000")), Some(0.08));
    }

    #[test]
    fn test_extract_skips_zero_prices() {
        let docs = json!([product("0.0000000000"), product("0.125")]);
        assert_eq!(extract_usd_price(&docs), Some(0.125));
    }

    #[test]
    fn test_extract_handles_malformed_documents() {
        assert_eq!(extract_usd_price(&json!(null)), None);
        assert_eq!(extract_usd_price(&json!({"terms": {}})), None);
        assert_eq!(extract_usd_price(&json!([])), None);
    }
}
