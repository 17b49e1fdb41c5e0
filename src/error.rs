//! Error types for wirecall.
//!
//! Two layers live here:
//! - [`RpcError`] — the crate-internal error type returned by fallible
//!   operations (parsing, sidecar registration, response encoding).
//! - [`ErrorStatus`] — the wire-visible failure envelope sent to clients,
//!   carrying a coarse [`ErrorCode`], a message, and an optional
//!   application-defined extension.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for all wirecall operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// I/O error while writing a queued response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Malformed call header or response layout.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Response payload exceeds the configured maximum.
    #[error("Response payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    /// Aggregate sidecar bytes would exceed the connection's cap.
    #[error("Sidecar limit exceeded: {requested} bytes over a cap of {max} bytes")]
    SidecarLimit { requested: usize, max: usize },

    /// Operation arrived after the call already responded.
    #[error("Call already responded")]
    AlreadyResponded,

    /// The connection's response queue is at capacity.
    #[error("Response queue full")]
    ResponseQueueFull,

    /// The connection's writer side is gone.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;

/// Coarse-grained error codes carried in failure responses.
///
/// These describe transport/protocol-level problems. Domain-specific
/// failures use [`ErrorStatus::application_error`] instead, which keeps
/// the code at [`ErrorCode::ApplicationError`] and attaches an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unclassified server-side failure.
    Unknown,
    /// Handler-defined failure; details in the extension fields.
    ApplicationError,
    /// The service exists but the method does not.
    NoSuchMethod,
    /// No service with the requested name is registered.
    NoSuchService,
    /// The request header or body was malformed.
    InvalidRequest,
    /// The server's worker queue rejected the call.
    ServerTooBusy,
}

/// Wire-visible failure envelope.
///
/// A failure response's payload is this struct, MsgPack-encoded. The
/// `(ext_id, message, app_payload)` triple is the extensibility mechanism
/// for non-generic failures: `ext_id` tells the client how to interpret
/// `app_payload`, which must round-trip bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStatus {
    /// Coarse error classification.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Application extension identifier; `None` for generic failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_id: Option<u32>,
    /// Opaque application error payload, interpreted per `ext_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_payload: Option<Vec<u8>>,
}

impl ErrorStatus {
    /// Create a generic failure envelope.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            ext_id: None,
            app_payload: None,
        }
    }

    /// Create an application-error envelope.
    ///
    /// The extension id selects how the client decodes `payload`.
    pub fn application_error(ext_id: u32, message: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            code: ErrorCode::ApplicationError,
            message: message.into(),
            ext_id: Some(ext_id),
            app_payload: Some(payload),
        }
    }

    /// Whether this envelope carries an application extension.
    #[inline]
    pub fn is_application_error(&self) -> bool {
        self.ext_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MsgPackCodec;

    #[test]
    fn test_generic_status_has_no_extension() {
        let status = ErrorStatus::new(ErrorCode::NoSuchMethod, "unknown method: Ping");
        assert_eq!(status.code, ErrorCode::NoSuchMethod);
        assert!(!status.is_application_error());
        assert!(status.app_payload.is_none());
    }

    #[test]
    fn test_application_error_round_trip() {
        let payload = vec![0x00, 0xFF, 0x10, 0x80, 0x7F];
        let status = ErrorStatus::application_error(42, "conflict", payload.clone());

        let encoded = MsgPackCodec::encode(&status).unwrap();
        let decoded: ErrorStatus = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded.code, ErrorCode::ApplicationError);
        assert_eq!(decoded.ext_id, Some(42));
        assert_eq!(decoded.message, "conflict");
        assert_eq!(decoded.app_payload.as_deref(), Some(payload.as_slice()));
    }

    #[test]
    fn test_error_display_messages() {
        let err = RpcError::SidecarLimit {
            requested: 2048,
            max: 1024,
        };
        assert!(err.to_string().contains("2048"));
        assert!(err.to_string().contains("1024"));

        let err = RpcError::Protocol("call header truncated".to_string());
        assert!(err.to_string().contains("call header truncated"));
    }
}
