use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server could not be reached.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// The body could not be read or decoded.
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },
    /// The caller lost interest before the body was read.
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
    /// A required identifier was empty; rejected before any request is made.
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),
}

impl ApiError {
    pub(crate) fn from_ureq(url: &str, error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(status, _) => Self::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => Self::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
