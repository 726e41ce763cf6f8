//! Typed error taxonomy for the relay's HTTP admission surface.
//!
//! Every variant carries a frozen wire code (see `relay_protocol::error_codes`)
//! and maps to a fixed HTTP status. WebSocket-side failures are reported as
//! in-band frames instead (see `ws::session`) since a protocol violation
//! should not drop the connection.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_protocol::{error_codes, HttpErrorEnvelope};
use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    // =========================================================================
    // Signing envelope
    // =========================================================================
    #[error("missing signing header")]
    MissingHeaders,

    #[error("malformed field: {0}")]
    BadField(&'static str),

    #[error("clock skew too large")]
    ClockSkew { server_time: i64 },

    #[error("nonce already claimed")]
    NonceReplay,

    #[error("signature verification failed")]
    BadSignature,

    #[error("payload hash does not match request body")]
    BadPayloadHash,

    // =========================================================================
    // Admission semantics
    // =========================================================================
    #[error("sid already pending")]
    SidExists,

    #[error("pcid has not called register-pc")]
    PcNotRegistered,

    #[error("event id failed grammar validation")]
    BadEventId,

    // =========================================================================
    // Transport
    // =========================================================================
    #[error("too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("service overloaded")]
    Overloaded { retry_after_secs: u64 },
}

impl RelayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeaders => error_codes::MISSING_HEADERS,
            Self::BadField(_) | Self::BadEventId => error_codes::BAD_FIELD,
            Self::ClockSkew { .. } => error_codes::CLOCK_SKEW,
            Self::NonceReplay => error_codes::NONCE_REPLAY,
            Self::BadSignature => error_codes::BAD_SIGNATURE,
            Self::BadPayloadHash => error_codes::BAD_PAYLOAD_HASH,
            Self::SidExists => error_codes::SID_EXISTS,
            Self::PcNotRegistered => error_codes::PC_NOT_REGISTERED,
            Self::RateLimited { .. } => error_codes::RATE_LIMITED,
            Self::Overloaded { .. } => error_codes::OVERLOADED,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeaders
            | Self::BadField(_)
            | Self::BadEventId
            | Self::BadPayloadHash => StatusCode::BAD_REQUEST,
            Self::ClockSkew { .. } | Self::NonceReplay | Self::BadSignature => {
                StatusCode::UNAUTHORIZED
            }
            Self::SidExists => StatusCode::CONFLICT,
            Self::PcNotRegistered => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Overloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = HttpErrorEnvelope::new(self.code());
        let mut response = (status, Json(body)).into_response();

        match &self {
            Self::ClockSkew { server_time } => {
                if let Ok(value) = HeaderValue::from_str(&server_time.to_string()) {
                    response.headers_mut().insert("X-Server-Time", value);
                }
            }
            Self::RateLimited { retry_after_secs } | Self::Overloaded { retry_after_secs } => {
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert("Retry-After", value);
                }
            }
            _ => {}
        }

        response
    }
}
