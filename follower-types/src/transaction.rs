use crate::shard::{Nonce, ShardId};
use serde::{Deserialize, Serialize};

/// A transaction or smart-contract result as reported by the gateway.
///
/// SCRs are represented by the same struct as ordinary transactions: an SCR
/// is simply a `ShardTransaction` whose `original_transaction_hash` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardTransaction {
    pub hash: String,
    pub nonce: Nonce,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub source_shard: ShardId,
    #[serde(default)]
    pub destination_shard: ShardId,
    #[serde(default)]
    pub status: String,
    /// Base64-encoded transaction payload.
    #[serde(default)]
    pub data: Option<String>,
    /// Set when this record is itself an SCR; identifies the logical parent transaction.
    #[serde(default)]
    pub original_transaction_hash: Option<String>,
    #[serde(default)]
    pub gas_price: Option<u64>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Modeled for completeness; never populated or consumed by the follower core.
    #[serde(default)]
    pub previous_transaction_hash: Option<String>,
}

impl ShardTransaction {
    /// Decodes `data` and returns it as text, if present and valid base64/UTF-8.
    ///
    /// Malformed payloads are treated as absent rather than propagated as an error:
    /// the gateway is not expected to send transactions this follower cannot decode.
    pub fn decoded_data(&self) -> Option<String> {
        let raw = self.data.as_ref()?;
        let bytes = base64::decode(raw).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// The substring of the decoded data before the first `@`, i.e. the smart
    /// contract function invoked by this transaction, if any.
    pub fn function_name(&self) -> Option<String> {
        let decoded = self.decoded_data()?;
        Some(decoded.split('@').next().unwrap_or_default().to_string())
    }

    /// The `@`-separated segments following the function name.
    pub fn arguments(&self) -> Vec<String> {
        match self.decoded_data() {
            Some(decoded) => decoded.split('@').skip(1).map(str::to_string).collect(),
            None => Vec::new(),
        }
    }

    /// True when `data` base64-decodes to `@6f6b`, the hex-of-"ok" success
    /// marker the gateway sends on cross-shard acknowledgement SCRs.
    pub fn is_ok_acknowledgement(&self) -> bool {
        self.decoded_data().as_deref() == Some("@6f6b")
    }
}

/// A block, normalized by the gateway client from the raw `block/{shard}/by-nonce/{nonce}`
/// response: the mini-block structure is flattened away, the transactions are left in the
/// order the gateway returned them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBlock {
    pub block_hash: String,
    pub transactions: Vec<ShardTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(data: &str) -> ShardTransaction {
        ShardTransaction {
            hash: "h".to_string(),
            nonce: 1,
            sender: String::new(),
            receiver: String::new(),
            value: "0".to_string(),
            source_shard: 0,
            destination_shard: 0,
            status: "success".to_string(),
            data: Some(data.to_string()),
            original_transaction_hash: None,
            gas_price: None,
            gas_limit: None,
            previous_transaction_hash: None,
        }
    }

    #[test]
    fn function_name_and_arguments_split_on_at() {
        // base64 of "foo@01@02"
        let t = tx("Zm9vQDAxQDAy");
        assert_eq!(t.function_name().as_deref(), Some("foo"));
        assert_eq!(t.arguments(), vec!["01".to_string(), "02".to_string()]);
    }

    #[test]
    fn ok_acknowledgement_is_recognized() {
        // base64 of "@6f6b"
        let t = tx("QDZmNmI=");
        assert!(t.is_ok_acknowledgement());
    }

    #[test]
    fn missing_data_yields_no_derived_fields() {
        let mut t = tx("");
        t.data = None;
        assert_eq!(t.decoded_data(), None);
        assert_eq!(t.function_name(), None);
        assert!(t.arguments().is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let t = tx("Zm9v");
        let json = serde_json::to_string(&t).unwrap();
        let back: ShardTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
