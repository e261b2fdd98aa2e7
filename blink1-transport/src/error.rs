//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    #[error("Invalid feature report: {0}")]
    InvalidReport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") || msg.contains("EACCES") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}

impl From<tokio::task::JoinError> for TransportError {
    fn from(e: tokio::task::JoinError) -> Self {
        TransportError::Internal(format!("HID worker task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_classified() {
        let err: TransportError = hidapi::HidError::HidApiError {
            message: "Permission denied".into(),
        }
        .into();
        assert!(matches!(err, TransportError::HidPermissionDenied(_)));
    }

    #[test]
    fn test_generic_hid_error() {
        let err: TransportError = hidapi::HidError::HidApiError {
            message: "Broken pipe".into(),
        }
        .into();
        assert!(matches!(err, TransportError::HidError(_)));
    }
}
