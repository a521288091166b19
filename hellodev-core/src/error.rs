// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for hellodev.
//!
//! Every failure is an explicit enum variant. Short transfers are not errors:
//! they are reported through [`crate::channel::Transfer`].

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::state::LifecycleState;

/// Top-level error type for the device.
#[derive(Debug, Error)]
pub enum DeviceError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Module Parameters
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid module parameters. The device refuses to load.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown module parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Malformed module argument '{argument}': expected key=value")]
    MalformedArgument { argument: String },
}

/// Errors surfaced by buffered channel transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The session was signalled while waiting for the buffer lock.
    /// No bytes were copied; the caller may retry.
    #[error("Interrupted while waiting for the buffer lock")]
    Interrupted,
}

impl ChannelError {
    /// Errno reported to the client for this error.
    pub fn errno(&self) -> Errno {
        match self {
            Self::Interrupted => Errno::EINTR,
        }
    }
}

/// Errors reported by a registration host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("{operation} failed: {errno}")]
    Errno {
        operation: &'static str,
        errno: Errno,
    },

    #[error("No device node at {path}")]
    NodeNotFound { path: String },

    #[error("No identity registered for major {major}")]
    IdentityNotFound { major: u32 },
}

impl HostError {
    /// The errno carried by this error, as the host would report it.
    pub fn errno(&self) -> Errno {
        match self {
            Self::Errno { errno, .. } => *errno,
            Self::NodeNotFound { .. } | Self::IdentityNotFound { .. } => Errno::ENODEV,
        }
    }
}

/// Registration steps, in the order `start()` performs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationStep {
    Identity,
    Class,
    Node,
}

impl RegistrationStep {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Class => "class",
            Self::Node => "node",
        }
    }
}

impl std::fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from the device registration lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A registration step failed. Completed steps were already rolled back.
    #[error("Registration of {step} failed: {source}")]
    RegistrationFailed {
        step: RegistrationStep,
        #[source]
        source: HostError,
    },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
}

impl LifecycleError {
    /// Errno to hand back to the loader. Host errors pass through unchanged.
    pub fn errno(&self) -> Errno {
        match self {
            Self::RegistrationFailed { source, .. } => source.errno(),
            Self::InvalidState { .. } => Errno::EBUSY,
        }
    }
}

/// Result type alias using DeviceError.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_maps_to_eintr() {
        assert_eq!(ChannelError::Interrupted.errno(), Errno::EINTR);
    }

    #[test]
    fn test_registration_failure_keeps_host_errno() {
        let err = LifecycleError::RegistrationFailed {
            step: RegistrationStep::Class,
            source: HostError::Errno {
                operation: "class_create",
                errno: Errno::ENOMEM,
            },
        };
        assert_eq!(err.errno(), Errno::ENOMEM);
        assert!(err.to_string().contains("class"));
    }

    #[test]
    fn test_error_chain() {
        let validation_err = HardValidationError::UnknownParameter {
            name: "major".to_string(),
        };
        let device_err: DeviceError = validation_err.into();
        assert!(matches!(device_err, DeviceError::HardValidation(_)));
    }
}
