//! Error handling utilities for proxy-catalog

use thiserror::Error;

/// Error type for every fallible operation in the catalog service
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("proxy transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid proxy format: {0}")]
    InvalidFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

pub type ProxyResult<T> = Result<T, ProxyError>;
