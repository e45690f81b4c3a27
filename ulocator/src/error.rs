//! Error types for the service registry

use std::any::TypeId;
use thiserror::Error;

/// Result type alias for registry operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while binding or resolving services
#[derive(Error, Debug)]
pub enum DiError {
    /// Service not bound in the registry
    #[error("Service not found: {service_type}")]
    ServiceNotFound {
        service_type: &'static str,
        type_id: TypeId,
    },

    /// A binding already exists for this interface
    #[error("Duplicate binding for {service_type}")]
    DuplicateBinding { service_type: &'static str },

    /// Circular dependency detected
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// Service creation failed
    #[error("Failed to create service: {service_type}: {reason}")]
    ServiceCreationFailed {
        service_type: &'static str,
        reason: String,
    },

    /// The registry was dropped while a handle to it was still needed
    #[error("Registry has been released")]
    RegistryReleased,

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("DI error: {0}")]
    Other(String),
}

impl DiError {
    /// Build a [`DiError::ServiceNotFound`] for `T`
    pub fn not_found<T: ?Sized + 'static>() -> Self {
        DiError::ServiceNotFound {
            service_type: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Build a [`DiError::ServiceCreationFailed`] for `T`
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        DiError::ServiceCreationFailed {
            service_type: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}
