use thiserror::Error;

use crate::transport::HttpMethod;

/// Failures below the response envelope: the request never produced a usable
/// JSON body. A server-side `success: false` is not an error at this level.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("http transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected http status {status} for {method} {url}")]
    UnexpectedStatus {
        method: HttpMethod,
        url: String,
        status: u16,
    },
    #[error("failed to decode response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode request parameters: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("successful response from {url} carried no data")]
    MissingData { url: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page region element is missing")]
    MissingRegion,
    #[error("transactions page must be created inside a tokio runtime")]
    NoRuntime,
}
