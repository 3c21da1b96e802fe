//! Reference price lookup for weighted bundle splits

use crate::error::{GameledgerError, Result};
use crate::models::AppId;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const STOREFRONT_ENDPOINT: &str = "https://store.steampowered.com/api/appdetails";

/// Source of a standalone reference price per entry
pub trait PriceSource {
    /// Current reference price for `id`, in whole currency units
    ///
    /// # Errors
    /// Returns `GameledgerError::PriceLookup` (or `Http`) when no price can
    /// be obtained
    fn price_of(&self, id: &AppId) -> Result<f64>;
}

/// Fetch a price for every id, plus the sum.
///
/// All-or-nothing: a single failed lookup fails the whole call, so a
/// weighted split can never be built from partial data.
///
/// # Errors
/// Propagates the first lookup failure
pub fn bundle_prices(
    source: &dyn PriceSource,
    ids: &[AppId],
) -> Result<(HashMap<AppId, f64>, f64)> {
    let mut prices = HashMap::new();
    let mut total = 0.0;
    for id in ids {
        let price = source.price_of(id)?;
        debug!(%id, price, "reference price");
        total += price;
        prices.insert(id.clone(), price);
    }
    Ok((prices, total))
}

#[derive(Debug, Deserialize)]
struct AppDetails {
    success: bool,
    data: Option<AppDetailsData>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsData {
    price_overview: Option<PriceOverview>,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    /// Current price in the store's minor currency units
    #[serde(rename = "final")]
    final_minor_units: i64,
}

/// Storefront price client (blocking)
pub struct SteamPriceClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    country: String,
}

impl SteamPriceClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(STOREFRONT_ENDPOINT, "us")
    }

    /// Point the client at a different endpoint or country code
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
            country: country.into(),
        }
    }
}

impl Default for SteamPriceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSource for SteamPriceClient {
    fn price_of(&self, id: &AppId) -> Result<f64> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("appids", id.as_str()),
                ("filters", "price_overview"),
                ("cc", &self.country),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GameledgerError::price_lookup(
                id.as_str(),
                format!("unexpected HTTP status {status}"),
            ));
        }

        let body: HashMap<String, AppDetails> = response.json()?;
        let details = body.get(id.as_str()).ok_or_else(|| {
            GameledgerError::price_lookup(id.as_str(), "app id missing from response")
        })?;
        if !details.success {
            return Err(GameledgerError::price_lookup(
                id.as_str(),
                "storefront reported failure",
            ));
        }

        // Free and unpriced apps carry no price block.
        let minor_units = details
            .data
            .as_ref()
            .and_then(|data| data.price_overview.as_ref())
            .map_or(0, |overview| overview.final_minor_units);
        Ok(minor_units as f64 / 100.0)
    }
}
