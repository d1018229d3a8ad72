//! Error taxonomy for submission and relay.
//!
//! `Validation` is surfaced to the submitter synchronously. Every other kind is
//! caught at the relay boundary and recorded as the job's `failed` state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport failure while fetching the source or talking to a remote API.
    #[error("network error: {0}")]
    Network(#[from] curl::Error),

    /// Non-success response from the source or the destination.
    #[error("upstream error: {origin} {detail}")]
    Upstream {
        origin: &'static str,
        status: Option<u32>,
        detail: String,
    },

    /// Destination answered 2xx but the body lacked the fields we need.
    #[error("malformed response from {origin}: {detail}")]
    MalformedResponse { origin: &'static str, detail: String },

    /// Job store read/write failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Submitted input rejected before any job was created.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Temporary sink could not be created, written or read.
    #[error("temp file error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Upstream answered with a non-2xx HTTP status.
    pub fn http_status(origin: &'static str, status: u32) -> Self {
        RelayError::Upstream {
            origin,
            status: Some(status),
            detail: format!("returned HTTP {status}"),
        }
    }

    /// Upstream answered 2xx but reported failure in its body.
    pub fn rejected(origin: &'static str, detail: impl Into<String>) -> Self {
        RelayError::Upstream {
            origin,
            status: None,
            detail: detail.into(),
        }
    }

    pub fn malformed(origin: &'static str, detail: impl Into<String>) -> Self {
        RelayError::MalformedResponse {
            origin,
            detail: detail.into(),
        }
    }

    /// Whether a later attempt could plausibly succeed (timeouts, dropped
    /// connections, throttling, 5xx). Nothing retries automatically; this lets
    /// callers tell transient transport failures from permanent ones.
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Network(e) => is_transient_curl_error(e),
            RelayError::Upstream {
                status: Some(code), ..
            } => matches!(code, 429 | 500..=599),
            RelayError::Upstream { status: None, .. }
            | RelayError::MalformedResponse { .. }
            | RelayError::Persistence(_)
            | RelayError::Validation(_)
            | RelayError::Io(_) => false,
        }
    }
}

fn is_transient_curl_error(e: &curl::Error) -> bool {
    e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
}
