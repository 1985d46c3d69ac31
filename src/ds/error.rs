use std::time::Duration;

use serde::Deserialize;

/// Retry-after applied when a rate-limit response omits one.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Errors originating from the delivery service layer.
///
/// Server error codes are mapped onto these variants once, at the transport
/// boundary. Everything above the transport matches on the variant, never on
/// the server's strings.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryServiceError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("Forbidden ({code}): {message}")]
    Forbidden { code: String, message: String },
    #[error("Unparseable server response: {0}")]
    Unparseable(String),
    #[error("Transport error (status {status}, {code}): {message}")]
    Transport {
        status: u16,
        code: String,
        message: String,
    },

    #[error("An unknown error occurred: {0}")]
    Other(anyhow::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    errcode: Option<String>,
    error: Option<String>,
    retry_after_ms: Option<u64>,
}

impl DeliveryServiceError {
    /// Classify a failed server response.
    ///
    /// # Arguments
    /// * `status` - HTTP status of the response
    /// * `body` - Raw response body, expected to be a JSON error object
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: ErrorBody = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(e) => return DeliveryServiceError::Unparseable(format!("status {status}: {e}")),
        };

        let code = parsed.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string());
        let message = parsed.error.unwrap_or_default();

        if code == "M_LIMIT_EXCEEDED" || status == 429 {
            let retry_after = parsed
                .retry_after_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return DeliveryServiceError::RateLimited { retry_after };
        }

        if code == "M_FORBIDDEN" || status == 403 {
            return DeliveryServiceError::Forbidden { code, message };
        }

        DeliveryServiceError::Transport {
            status,
            code,
            message,
        }
    }

    /// Server error code, when the server supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            DeliveryServiceError::RateLimited { .. } => Some("M_LIMIT_EXCEEDED"),
            DeliveryServiceError::Forbidden { code, .. }
            | DeliveryServiceError::Transport { code, .. } => Some(code),
            DeliveryServiceError::Unparseable(_) | DeliveryServiceError::Other(_) => None,
        }
    }
}
