//! Error types for the dashboard data layer.
//!
//! Failures are layered: the transport reports [`ServiceError`], the view
//! controllers wrap it in [`ViewError`] together with local validation and
//! precondition failures. Nothing here is fatal to the process; every error
//! is confined to the view that raised it.

use thiserror::Error;

/// Remote data service error
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP request failed (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-2xx status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Service is not reachable (used by in-memory services)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Client configuration was rejected before any request was made
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Error raised by a view controller operation.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Primary collection fetch failed; the view is in the failed state
    #[error("Failed to load {entity}: {source}")]
    Fetch {
        entity: &'static str,
        #[source]
        source: ServiceError,
    },

    /// Create or update was rejected; local state is untouched
    #[error("Failed to save {entity}: {source}")]
    Mutation {
        entity: &'static str,
        #[source]
        source: ServiceError,
    },

    /// A required field was empty; no request was issued
    #[error("{message}")]
    Validation { field: String, message: String },

    /// The record being edited has no identifier to address the update
    #[error("Record has no identifier")]
    MissingIdentifier,

    /// `save_edit` or `edit_field` called while no draft is open
    #[error("No edit in progress")]
    NoEditOpen,

    /// The view has no editable fields
    #[error("{0} records are read-only")]
    NotEditable(&'static str),

    /// The view does not support creating records
    #[error("{0} records cannot be created from this view")]
    NotCreatable(&'static str),

    /// `create_entity` or `edit_create_field` called with no form open
    #[error("No creation form is open")]
    NoCreateForm,

    /// The view has no facet field to filter on
    #[error("{0} view has no filter")]
    NoFacet(&'static str),

    /// Sort requested on a column the view does not declare
    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),
}

impl ViewError {
    /// Whether this error came from local validation rather than the server.
    pub fn is_validation(&self) -> bool {
        matches!(self, ViewError::Validation { .. })
    }
}

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::config::DashboardConfig`]
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Base URL is empty or not http(s)
    #[error("Invalid base URL: {0:?}")]
    InvalidBaseUrl(String),
}

/// Result type for data service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Result type for view operations
pub type Result<T> = std::result::Result<T, ViewError>;
