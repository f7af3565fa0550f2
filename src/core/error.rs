// ============================================================================
// shared-map - Errors
// Container failures and the classified errors raised by map operations
// ============================================================================

use std::fmt;

use thiserror::Error;

use super::constants::STATE_ERROR_NAME;

// =============================================================================
// CONTAINER ERROR
// =============================================================================

/// Failure inside the state container or while keying records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// The state is already borrowed (a write from inside `with_state`)
    #[error("state `{label}` is already in use")]
    Busy { label: String },

    /// A record has no usable value in its key field
    #[error("element has no usable `{field}` key field")]
    MissingKey { field: String },
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Which map operation raised a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CreateMap,
    AddData,
    RemoveData,
    RefreshMap,
    ResetMap,
}

impl ErrorCode {
    /// The wire-style code string, e.g. `ADD_DATA_ERROR`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CreateMap => "CREATE_MAP_ERROR",
            ErrorCode::AddData => "ADD_DATA_ERROR",
            ErrorCode::RemoveData => "REMOVE_DATA_ERROR",
            ErrorCode::RefreshMap => "REFRESH_MAP_ERROR",
            ErrorCode::ResetMap => "RESET_MAP_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a classified error is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => f.write_str("LOW"),
            Severity::Medium => f.write_str("MEDIUM"),
            Severity::High => f.write_str("HIGH"),
        }
    }
}

/// Everything needed to classify a raw failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub name: &'static str,
    pub code: ErrorCode,
    pub message: &'static str,
    pub severity: Severity,
}

impl ErrorDescriptor {
    /// Descriptor used by every map operation: "State Error", HIGH severity.
    pub const fn state(code: ErrorCode, message: &'static str) -> Self {
        Self {
            name: STATE_ERROR_NAME,
            code,
            message,
            severity: Severity::High,
        }
    }
}

pub(crate) const CREATE_MAP: ErrorDescriptor =
    ErrorDescriptor::state(ErrorCode::CreateMap, "Error creating map");
pub(crate) const ADD_DATA: ErrorDescriptor =
    ErrorDescriptor::state(ErrorCode::AddData, "Error adding data");
pub(crate) const REMOVE_DATA: ErrorDescriptor =
    ErrorDescriptor::state(ErrorCode::RemoveData, "Error removing data");
pub(crate) const REFRESH_MAP: ErrorDescriptor =
    ErrorDescriptor::state(ErrorCode::RefreshMap, "Refresh map error");
pub(crate) const RESET_MAP: ErrorDescriptor =
    ErrorDescriptor::state(ErrorCode::ResetMap, "Reset map error");

// =============================================================================
// STATE ERROR
// =============================================================================

/// A classified error: descriptor plus the failure that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name} [{code}]: {message}")]
pub struct StateError {
    name: &'static str,
    code: ErrorCode,
    message: &'static str,
    severity: Severity,
    #[source]
    cause: ContainerError,
}

impl StateError {
    /// Classify a raw failure with the given descriptor.
    ///
    /// Logs the classified error once at `error` level.
    pub fn transform(cause: ContainerError, descriptor: ErrorDescriptor) -> Self {
        tracing::error!(
            code = %descriptor.code,
            severity = %descriptor.severity,
            cause = %cause,
            "{}",
            descriptor.message
        );

        Self {
            name: descriptor.name,
            code: descriptor.code,
            message: descriptor.message,
            severity: descriptor.severity,
            cause,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The underlying failure
    pub fn cause(&self) -> &ContainerError {
        &self.cause
    }
}

// =============================================================================
// TESTS
// =============================================================================
