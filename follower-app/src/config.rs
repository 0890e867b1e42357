use serde::Deserialize;

use crate::store::CursorStorageConfig;

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub gateway_url: String,
    pub cursor_storage: CursorStorageConfig,
    pub output_storage: OutputStorageConfig,
    #[serde(default = "default_max_look_behind")]
    pub max_look_behind: Option<u64>,
    #[serde(default = "default_true")]
    pub wait_for_finalized_cross_shard_scrs: bool,
    #[serde(default)]
    pub notify_empty_blocks: bool,
    #[serde(default)]
    pub include_cross_shard_started_transactions: bool,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OutputStorageConfig {
    /// Path to the folder where delivered batches are stored as JSON files.
    pub path: String,
    /// Number of nonces (per shard) to store per folder bucket.
    pub batch_size: u64,
}

fn default_max_look_behind() -> Option<u64> {
    Some(100)
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_applies_documented_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "gatewayUrl": "https://gateway.example.com",
                "cursorStorage": {"path": "state/cursors.json"},
                "outputStorage": {"path": "state/blocks", "batchSize": 1000}
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_look_behind, Some(100));
        assert!(config.wait_for_finalized_cross_shard_scrs);
        assert!(!config.notify_empty_blocks);
    }
}
