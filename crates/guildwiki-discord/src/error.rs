use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited on {route} (retry after {retry_after_secs}s)")]
    RateLimited {
        route: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("missing access to {url}")]
    Forbidden { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("pagination limit reached for {route}: exceeded {max_pages} pages")]
    PaginationLimit { route: String, max_pages: usize },

    #[error("invalid bot token: {0}")]
    InvalidToken(String),

    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("gateway protocol error: {0}")]
    Protocol(String),

    #[error("gateway closed the session with fatal code {code}: {reason}")]
    FatalClose { code: u16, reason: String },
}

impl From<tokio_tungstenite::tungstenite::Error> for DiscordError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
