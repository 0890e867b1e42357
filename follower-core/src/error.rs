/// Errors the follower can surface to its caller.
///
/// Gateway failures never appear here: they are absorbed by the gateway
/// client into `None`/empty results, since a stalled or unreachable node is
/// the expected transient case, not a hard error.
#[derive(Debug, thiserror::Error)]
pub enum FollowerError {
    #[error("follower is already running")]
    AlreadyRunning,

    #[error("cursor store failed: {0}")]
    CursorStore(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("consumer callback failed: {0}")]
    Consumer(#[source] Box<dyn std::error::Error + Send + Sync>),
}
