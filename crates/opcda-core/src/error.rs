// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for OPC DA client operations.
//!
//! Failures fall into three kinds:
//!
//! - **Validation**: malformed arguments, detected before any remote call.
//! - **Transport**: the connection is broken. Raised to the caller and
//!   broadcast as a connection health event by the call gate.
//! - **Domain**: the server answered, but a particular item, property or
//!   page failed. These are returned as [`StatusCode`] fields on results and
//!   never appear here, except when a single remote call *is* the whole
//!   request (see [`RemoteError`]).
//!
//! # Error Categories
//!
//! ```text
//! OpcDaError
//! ├── Validation    - Arguments rejected before any remote call
//! ├── Transport     - Connection-fatal status from the transport
//! ├── Remote        - A remote call completed with a failure status
//! ├── Protocol      - Server response violates the interface contract
//! ├── Configuration - Invalid client settings or unreadable config file
//! └── Capability    - Server lacks a required interface
//! ```
//!
//! # Examples
//!
//! ```
//! use opcda_core::error::{OpcDaError, TransportError};
//! use opcda_core::StatusCode;
//!
//! let error = OpcDaError::from(TransportError::from_status(
//!     "Matrikon.OPC.Simulation",
//!     "Browse",
//!     StatusCode::RPC_E_SERVER_DIED,
//! ));
//!
//! assert!(error.is_transport());
//! assert_eq!(error.status(), Some(StatusCode::RPC_E_SERVER_DIED));
//! ```

use std::fmt;
use std::io;

use thiserror::Error;
use tracing::Level;

use crate::status::StatusCode;

// =============================================================================
// OpcDaError - Main Error Type
// =============================================================================

/// The main error type for OPC DA client operations.
#[derive(Debug, Error)]
pub enum OpcDaError {
    /// Arguments rejected before any remote call.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The connection is broken.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// A remote call completed with a failure status.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// The server response violates the interface contract.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The server lacks a required capability.
    #[error("{0}")]
    Capability(#[from] CapabilityError),
}

impl OpcDaError {
    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::invalid_argument(name, reason))
    }

    /// Creates a remote call failure.
    pub fn remote(object: impl Into<String>, operation: impl Into<String>, status: StatusCode) -> Self {
        Self::Remote(RemoteError::new(object, operation, status))
    }

    /// Classifies a failed call status into a transport or remote error.
    pub fn from_call_status(
        object: impl Into<String>,
        operation: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        if status.is_transport_fatal() {
            Self::Transport(TransportError::from_status(object, operation, status))
        } else {
            Self::remote(object, operation, status)
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(capability: impl Into<String>) -> Self {
        Self::Capability(CapabilityError::not_supported(capability))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error means the connection is broken.
    #[inline]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this error was raised before any remote call.
    #[inline]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the status code reported by the server or transport, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(e) => Some(e.status()),
            Self::Remote(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns `true` if repeating the operation later may succeed.
    ///
    /// The client never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Remote(e) => e.is_retryable(),
            Self::Validation(_)
            | Self::Protocol(_)
            | Self::Configuration(_)
            | Self::Capability(_) => false,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(_) => ErrorSeverity::Warning,
            Self::Transport(_) => ErrorSeverity::Critical,
            Self::Remote(_) => ErrorSeverity::Warning,
            Self::Protocol(_) => ErrorSeverity::Error,
            Self::Configuration(_) => ErrorSeverity::Error,
            Self::Capability(_) => ErrorSeverity::Error,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Remote(_) => "remote",
            Self::Protocol(_) => "protocol",
            Self::Configuration(_) => "configuration",
            Self::Capability(_) => "capability",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Remote(_) => ErrorCode::new(3, 1),
            Self::Protocol(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
            Self::Capability(e) => e.error_code(),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Validation(_) => vec!["Correct the arguments; nothing was sent to the server"],
            Self::Transport(_) => vec![
                "The connection is broken; reconnect before issuing further calls",
                "Check that the server process is still running",
            ],
            Self::Remote(_) => vec![
                "Inspect the status code for the cause",
                "Verify the item path exists in the server address space",
            ],
            Self::Protocol(_) => vec!["The server violated the interface contract; report it to the vendor"],
            Self::Configuration(_) => vec!["Check the client configuration file"],
            Self::Capability(_) => vec![
                "Use a server that implements the required interface",
                "Select a different browse mode",
            ],
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();
        let status = self.status().map(|s| s.to_string()).unwrap_or_default();
        let hint = self.recovery_hints().first().copied().unwrap_or_default();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                status = %status,
                hint,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                status = %status,
                hint,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                status = %status,
                hint,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ValidationError
// =============================================================================

/// Arguments rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Vendor status offset outside the reserved range.
    #[error("Status offset 0x{offset:X} outside the vendor range 0x{min:04X}..=0x{max:04X}")]
    OffsetOutOfRange {
        /// The rejected offset.
        offset: u32,
        /// Lowest allowed offset.
        min: u32,
        /// Highest allowed offset.
        max: u32,
    },

    /// Two parallel argument arrays differ in length.
    #[error("Length mismatch for '{what}': expected {expected}, got {actual}")]
    LengthMismatch {
        /// Argument name.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A page size of zero.
    #[error("Batch size must be positive")]
    ZeroBatchSize,

    /// A generic invalid argument.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Reason.
        reason: String,
    },
}

impl ValidationError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::OffsetOutOfRange { .. } => ErrorCode::new(1, 1),
            Self::LengthMismatch { .. } => ErrorCode::new(1, 2),
            Self::ZeroBatchSize => ErrorCode::new(1, 3),
            Self::InvalidArgument { .. } => ErrorCode::new(1, 4),
        }
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// The transport reported that the connection is broken.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote object disconnected from its clients.
    #[error("Connection to '{object}' terminated during {operation}: {status}")]
    Disconnected {
        /// Remote object identity.
        object: String,
        /// Operation name.
        operation: String,
        /// Transport status.
        status: StatusCode,
    },

    /// The server process died.
    #[error("Server '{object}' died during {operation}: {status}")]
    ServerDied {
        /// Remote object identity.
        object: String,
        /// Operation name.
        operation: String,
        /// Transport status.
        status: StatusCode,
    },

    /// The client side of the call died.
    #[error("Client died while calling {operation} on '{object}': {status}")]
    ClientDied {
        /// Remote object identity.
        object: String,
        /// Operation name.
        operation: String,
        /// Transport status.
        status: StatusCode,
    },

    /// The server is unreachable.
    #[error("Server '{object}' unavailable for {operation}: {status}")]
    ServerUnavailable {
        /// Remote object identity.
        object: String,
        /// Operation name.
        operation: String,
        /// Transport status.
        status: StatusCode,
    },
}

impl TransportError {
    /// Builds the variant matching a transport status.
    pub fn from_status(
        object: impl Into<String>,
        operation: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        let object = object.into();
        let operation = operation.into();
        match status {
            StatusCode::RPC_E_SERVER_DIED | StatusCode::RPC_E_SERVER_DIED_DNE => Self::ServerDied {
                object,
                operation,
                status,
            },
            StatusCode::RPC_E_CLIENT_DIED => Self::ClientDied {
                object,
                operation,
                status,
            },
            StatusCode::RPC_S_SERVER_UNAVAILABLE => Self::ServerUnavailable {
                object,
                operation,
                status,
            },
            _ => Self::Disconnected {
                object,
                operation,
                status,
            },
        }
    }

    /// Returns the transport status.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Disconnected { status, .. }
            | Self::ServerDied { status, .. }
            | Self::ClientDied { status, .. }
            | Self::ServerUnavailable { status, .. } => *status,
        }
    }

    /// Returns the operation that was in flight.
    pub fn operation(&self) -> &str {
        match self {
            Self::Disconnected { operation, .. }
            | Self::ServerDied { operation, .. }
            | Self::ClientDied { operation, .. }
            | Self::ServerUnavailable { operation, .. } => operation,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Disconnected { .. } => ErrorCode::new(2, 1),
            Self::ServerDied { .. } => ErrorCode::new(2, 2),
            Self::ClientDied { .. } => ErrorCode::new(2, 3),
            Self::ServerUnavailable { .. } => ErrorCode::new(2, 4),
        }
    }
}

// =============================================================================
// RemoteError
// =============================================================================

/// A remote call completed but reported a failure status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} on '{object}' failed: {status}")]
pub struct RemoteError {
    /// Remote object identity.
    pub object: String,
    /// Operation name.
    pub operation: String,
    /// Failure status.
    pub status: StatusCode,
}

impl RemoteError {
    /// Creates a remote error.
    pub fn new(object: impl Into<String>, operation: impl Into<String>, status: StatusCode) -> Self {
        Self {
            object: object.into(),
            operation: operation.into(),
            status,
        }
    }

    /// Returns `true` if the status suggests a transient condition.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status,
            StatusCode::RPC_E_CALL_REJECTED | StatusCode::RPC_E_TIMEOUT | StatusCode::E_OUTOFMEMORY
        )
    }
}

// =============================================================================
// ProtocolError
// =============================================================================

/// The server's response violates the interface contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Result count differs from request count.
    #[error("{operation} returned {actual} results for {expected} requests")]
    LengthMismatch {
        /// Operation name.
        operation: String,
        /// Number of requested entries.
        expected: usize,
        /// Number of returned entries.
        actual: usize,
    },

    /// Malformed response.
    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse {
        /// Operation name.
        operation: String,
        /// Reason.
        reason: String,
    },
}

impl ProtocolError {
    /// Creates a length mismatch error.
    pub fn length_mismatch(operation: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            operation: operation.into(),
            expected,
            actual,
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::LengthMismatch { .. } => ErrorCode::new(4, 1),
            Self::InvalidResponse { .. } => ErrorCode::new(4, 2),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A field has an invalid value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Reason.
        reason: String,
    },

    /// Unknown configuration file format.
    #[error("Unsupported configuration format: '{extension}'")]
    UnsupportedFormat {
        /// File extension.
        extension: String,
    },

    /// The content could not be parsed.
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        /// Format name.
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// The file could not be read.
    #[error("Failed to read configuration '{path}'")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ConfigurationError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidValue { .. } => ErrorCode::new(5, 1),
            Self::UnsupportedFormat { .. } => ErrorCode::new(5, 2),
            Self::Parse { .. } => ErrorCode::new(5, 3),
            Self::Io { .. } => ErrorCode::new(5, 4),
        }
    }
}

// =============================================================================
// CapabilityError
// =============================================================================

/// The server does not offer what the client needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// A required interface is missing.
    #[error("Server does not support {capability}")]
    NotSupported {
        /// Missing capability.
        capability: String,
    },

    /// Every discovery strategy failed.
    #[error("No discovery strategy succeeded for '{host}' (tried: {})", attempts.join(", "))]
    DiscoveryExhausted {
        /// Host that was queried.
        host: String,
        /// Strategy names and failure summaries, in order.
        attempts: Vec<String>,
    },
}

impl CapabilityError {
    /// Creates a not supported error.
    pub fn not_supported(capability: impl Into<String>) -> Self {
        Self::NotSupported {
            capability: capability.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotSupported { .. } => ErrorCode::new(6, 1),
            Self::DiscoveryExhausted { .. } => ErrorCode::new(6, 2),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `DA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Validation
/// - 2: Transport
/// - 3: Remote
/// - 4: Protocol
/// - 5: Configuration
/// - 6: Capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-6).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcDaError.
pub type OpcDaResult<T> = Result<T, OpcDaError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_call_status() {
        let fatal = OpcDaError::from_call_status("srv", "Browse", StatusCode::RPC_E_DISCONNECTED);
        assert!(fatal.is_transport());
        assert!(matches!(
            fatal,
            OpcDaError::Transport(TransportError::Disconnected { .. })
        ));

        let domain = OpcDaError::from_call_status("srv", "Browse", StatusCode::OPC_E_UNKNOWNITEMID);
        assert!(!domain.is_transport());
        assert_eq!(domain.status(), Some(StatusCode::OPC_E_UNKNOWNITEMID));
    }

    #[test]
    fn test_transport_variants() {
        let died = TransportError::from_status("srv", "GetProperties", StatusCode::RPC_E_SERVER_DIED_DNE);
        assert!(matches!(died, TransportError::ServerDied { .. }));
        assert_eq!(died.operation(), "GetProperties");

        let gone = TransportError::from_status("srv", "Browse", StatusCode::RPC_S_SERVER_UNAVAILABLE);
        assert!(matches!(gone, TransportError::ServerUnavailable { .. }));

        let client = TransportError::from_status("srv", "Browse", StatusCode::RPC_E_CLIENT_DIED);
        assert_eq!(client.status(), StatusCode::RPC_E_CLIENT_DIED);
    }

    #[test]
    fn test_validation_error_message() {
        let error = ValidationError::OffsetOutOfRange {
            offset: 0x100,
            min: 0x200,
            max: 0xFFFF,
        };
        assert!(error.to_string().contains("0x100"));
        assert!(OpcDaError::from(error).is_validation());
    }

    #[test]
    fn test_error_code() {
        let code = ErrorCode::new(2, 4);
        assert_eq!(code.to_string(), "DA-0204");
        assert_eq!(code.as_u16(), 0x0204);
    }

    #[test]
    fn test_severity_and_category() {
        let transport = OpcDaError::from_call_status("srv", "Browse", StatusCode::RPC_E_SERVER_DIED);
        assert_eq!(transport.severity(), ErrorSeverity::Critical);
        assert_eq!(transport.category(), "transport");
        assert!(transport.is_retryable());

        let validation = OpcDaError::from(ValidationError::ZeroBatchSize);
        assert_eq!(validation.severity(), ErrorSeverity::Warning);
        assert!(!validation.is_retryable());
        assert!(!validation.recovery_hints().is_empty());
    }

    #[test]
    fn test_remote_retryable() {
        assert!(RemoteError::new("srv", "Browse", StatusCode::RPC_E_CALL_REJECTED).is_retryable());
        assert!(!RemoteError::new("srv", "Browse", StatusCode::OPC_E_UNKNOWNITEMID).is_retryable());
    }

    #[test]
    fn test_discovery_exhausted_message() {
        let error = CapabilityError::DiscoveryExhausted {
            host: "plc-01".to_string(),
            attempts: vec!["enum_classes: E_FAIL".to_string(), "registry: E_ACCESSDENIED".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("plc-01"));
        assert!(message.contains("enum_classes"));
    }
}
