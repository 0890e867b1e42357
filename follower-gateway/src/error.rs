/// Errors that can escape the gateway client's construction.
///
/// Per-request transport and decoding failures never surface through this
/// type: they are absorbed into `Ok(None)` by design (see `Gateway::get_block_by_nonce`),
/// since a transient gap at the tip is the expected common case, not an error.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid gateway base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
}
