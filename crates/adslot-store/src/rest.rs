//! Hosted database REST client.
//!
//! Talks to a PostgREST-style endpoint: campaigns are read from a table with
//! the placement joined in, counters are bumped through stored procedures.

use std::sync::Arc;
use std::time::Duration;

use adslot_core::{AdId, Clock, StoreConfig, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::RequestBuilder;
use tracing::debug;

use crate::{CampaignRow, CampaignStore, Counter, StoreError, ACTIVE_STATUS};

/// Campaign store backed by the hosted database's REST interface.
pub struct RestCampaignStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    campaigns_table: String,
    placements_table: String,
    clock: Arc<dyn Clock>,
}

impl RestCampaignStore {
    /// Build a client from configuration. Requires `base_url`.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| StoreError::Config("store.base_url is not set".to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            campaigns_table: config.campaigns_table.clone(),
            placements_table: config.placements_table.clone(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Use an explicit time source for the activity window.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn campaigns_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.campaigns_table)
    }

    fn rpc_url(&self, counter: Counter) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, counter.rpc_name())
    }

    /// Query parameters selecting campaigns active at `now`.
    pub fn campaign_query(&self, now: DateTime<Utc>, placement: Option<&str>) -> Vec<(String, String)> {
        let ts = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let join = if placement.is_some() { "!inner" } else { "" };

        let mut query = vec![
            (
                "select".to_string(),
                format!("*,placement:{}{}(slug)", self.placements_table, join),
            ),
            ("status".to_string(), format!("eq.{}", ACTIVE_STATUS)),
            (
                "and".to_string(),
                format!(
                    "(or(start_date.is.null,start_date.lte.{ts}),or(end_date.is.null,end_date.gte.{ts}))"
                ),
            ),
        ];
        if let Some(slug) = placement {
            query.push(("placement.slug".to_string(), format!("eq.{}", slug)));
        }
        query
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("apikey", key).bearer_auth(key),
            None => req,
        }
    }
}

fn check_status(resp: &reqwest::Response) -> Result<(), StoreError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(StoreError::Http {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

#[async_trait]
impl CampaignStore for RestCampaignStore {
    async fn fetch_active_campaigns(
        &self,
        placement: Option<&str>,
    ) -> Result<Vec<CampaignRow>, StoreError> {
        let now = self.clock.now();
        let req = self
            .client
            .get(self.campaigns_url())
            .query(&self.campaign_query(now, placement));

        let resp = self.authorize(req).send().await?;
        check_status(&resp)?;
        let rows: Vec<CampaignRow> = resp.json().await?;
        let fetched = rows.len();

        // The server filters too; this keeps clock skew from leaking ended campaigns.
        let rows: Vec<CampaignRow> = rows.into_iter().filter(|r| r.is_active_at(now)).collect();
        debug!(fetched, active = rows.len(), placement = ?placement, "fetched campaigns");
        Ok(rows)
    }

    async fn increment(&self, id: &AdId, counter: Counter) -> Result<(), StoreError> {
        let req = self
            .client
            .post(self.rpc_url(counter))
            .json(&serde_json::json!({ "campaign_id": id.as_str() }));

        let resp = self.authorize(req).send().await?;
        check_status(&resp)?;
        debug!(ad_id = %id, %counter, "counter incremented");
        Ok(())
    }
}
