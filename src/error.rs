//! Error types for Beauty Book.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Failures on the session / readiness / onboarding path.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("No authenticated session")]
    NotAuthenticated,

    #[error("Provider profile missing for {provider_id}")]
    ProfileMissing { provider_id: String },

    #[error("Role {actual} cannot access {path}")]
    RoleMismatch { path: String, actual: &'static str },

    #[error("Read failed: {0}")]
    ReadFailure(#[source] DatabaseError),

    #[error("Write failed: {0}")]
    WriteFailure(#[source] DatabaseError),
}

/// Failures while recording an onboarding step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{0}")]
    Invalid(String),

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Failed to update onboarding step: {0}")]
    Write(#[source] DatabaseError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
