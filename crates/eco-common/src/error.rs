/// Error types shared across the advisor crates.
///
/// These cover infrastructure collaborators (Redis, the web search API) rather than
/// scoring logic. Service crates wrap `CommonError` via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis cache is disabled")]
    RedisDisabled,

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider returned error: status={status} body={body}")]
    SearchUpstream {
        status: reqwest::StatusCode,
        body: String,
    },
}
