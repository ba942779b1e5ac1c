//! HTTP access to the remote countries dataset.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::domain::Country;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Settings,
    error::FetchError,
    sort::name_key,
    types::{RemoteCountryRecord, REQUESTED_FIELDS},
};

/// Anything that can produce the full, normalized country list.
///
/// Implementations must resolve to [`FetchError::Cancelled`] once `cancel`
/// fires instead of completing with a stale result.
#[async_trait]
pub trait CountrySource: Send + Sync {
    async fn fetch_countries(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Country>, FetchError>;
}

pub struct RestCountriesClient {
    http: Client,
    endpoint: Url,
}

impl RestCountriesClient {
    pub fn new(api_url: &str) -> Result<Self> {
        Self::with_http(api_url, Client::new())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build countries http client")?;
        Self::with_http(&settings.api_url, http)
    }

    pub fn with_http(api_url: &str, http: Client) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: endpoint_url(api_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches and normalizes every country, ordered by name.
    ///
    /// Without a token the request simply runs to completion.
    pub async fn fetch_all(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> std::result::Result<Vec<Country>, FetchError> {
        let Some(cancel) = cancel else {
            return self.request().await;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("countries: fetch cancelled endpoint={}", self.endpoint);
                Err(FetchError::Cancelled)
            }
            result = self.request() => result,
        }
    }

    async fn request(&self) -> std::result::Result<Vec<Country>, FetchError> {
        let res = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        if !status.is_success() {
            warn!(
                "countries: fetch failed status={} endpoint={}",
                status.as_u16(),
                self.endpoint
            );
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let records: Vec<Value> = res.json().await.map_err(FetchError::Decode)?;
        let countries = normalize_records(records);
        info!("countries: fetched count={}", countries.len());
        Ok(countries)
    }
}

#[async_trait]
impl CountrySource for RestCountriesClient {
    async fn fetch_countries(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Country>, FetchError> {
        self.fetch_all(Some(cancel)).await
    }
}

/// Maps raw records to countries and applies the baseline name ordering, so
/// the result does not depend on the order the server happened to use.
pub fn normalize_records(records: Vec<Value>) -> Vec<Country> {
    let mut countries: Vec<Country> = records
        .into_iter()
        .map(|record| RemoteCountryRecord::from_value(record).into_country())
        .collect();
    countries.sort_by_cached_key(|c| name_key(&c.name));
    countries
}

fn endpoint_url(api_url: &str) -> Result<Url> {
    let mut url = Url::parse(api_url.trim())
        .with_context(|| format!("invalid countries api url: {api_url}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("countries api url must start with http:// or https://");
    }
    if !url.query_pairs().any(|(key, _)| key == "fields") {
        url.query_pairs_mut().append_pair("fields", REQUESTED_FIELDS);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
