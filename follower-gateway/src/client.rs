use crate::dto::{BlockEnvelope, Envelope, NetworkConfigEnvelope, NetworkStatusEnvelope};
use crate::error::GatewayError;
use async_trait::async_trait;
use shard_follower_types::{GatewayBlock, Nonce, ShardId, METACHAIN_SHARD_ID};

/// Default base URL; callers typically override it from config.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.elrond.com";

/// The subset of the gateway HTTP API the follower core depends on.
///
/// Expressed as a trait so the cursor loop and orchestrator can be driven
/// against a mock in tests without any network access.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Reads `network/config` and returns every shard id, execution shards
    /// first in ascending order, followed by the metachain sentinel.
    async fn get_shard_ids(&self) -> Vec<ShardId>;

    /// Reads `network/status/{shardId}` and returns the live tip nonce.
    /// Absent on any transport or decoding failure.
    async fn get_tip_nonce(&self, shard_id: ShardId) -> Option<Nonce>;

    /// Reads `block/{shardId}/by-nonce/{nonce}?withTxs=true`.
    /// Absent when the block does not exist yet, or on any transport or decoding failure.
    async fn get_block_by_nonce(&self, shard_id: ShardId, nonce: Nonce) -> Option<GatewayBlock>;
}

/// `reqwest`-backed implementation of [`Gateway`].
#[derive(Clone)]
pub struct GatewayClient {
    base_url: url::Url,
    http_client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let base_url = url::Url::parse(base_url)?;
        let user_agent = concat!("shard-follower/", env!("CARGO_PKG_VERSION"));
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(GatewayError::ClientBuild)?;
        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn url(&self, path: &str) -> url::Url {
        self.base_url
            .join(path)
            .expect("gateway path must be valid to join onto the base URL")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = self.url(path);
        let response = match self.http_client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %url, err = %err, "gateway request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(url = %url, status = %response.status(), "gateway returned non-success status");
            return None;
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(url = %url, err = %err, "failed to read gateway response body");
                return None;
            }
        };
        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => Some(envelope.data),
            Err(err) => {
                tracing::warn!(url = %url, err = %err, "failed to decode gateway response");
                None
            }
        }
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn get_shard_ids(&self) -> Vec<ShardId> {
        let config: Option<NetworkConfigEnvelope> = self.get_json("network/config").await;
        let num_shards = match config {
            Some(config) => config.config.erd_num_shards_without_meta,
            None => {
                tracing::warn!("failed to fetch network config; assuming zero execution shards");
                0
            }
        };
        let mut shard_ids: Vec<ShardId> = (0..num_shards).collect();
        shard_ids.push(METACHAIN_SHARD_ID);
        shard_ids
    }

    async fn get_tip_nonce(&self, shard_id: ShardId) -> Option<Nonce> {
        let path = format!("network/status/{shard_id}");
        let status: NetworkStatusEnvelope = self.get_json(&path).await?;
        Some(status.status.erd_nonce)
    }

    async fn get_block_by_nonce(&self, shard_id: ShardId, nonce: Nonce) -> Option<GatewayBlock> {
        let path = format!("block/{shard_id}/by-nonce/{nonce}?withTxs=true");
        let envelope: BlockEnvelope = self.get_json(&path).await?;
        let block = envelope.block?;
        let transactions = block
            .mini_blocks
            .into_iter()
            .flat_map(|mini_block| mini_block.transactions)
            .collect();
        Some(GatewayBlock {
            block_hash: block.hash,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let err = GatewayClient::new("not a url");
        assert!(err.is_err());
    }

    #[test]
    fn default_url_is_well_formed() {
        GatewayClient::new(DEFAULT_GATEWAY_URL).unwrap();
    }
}
