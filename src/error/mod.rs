use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Tree mutation failure.
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Backend failure.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Page controller refusal.
    #[error("Page error: {0}")]
    Page(#[from] PageError),

    /// A prefill or facts file could not be read.
    #[error("Invalid input file {path}: {message}")]
    InvalidFile { path: String, message: String },
}

/// In-memory tree errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// The parent of a new node does not exist.
    #[error("Parent node not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// The node to edit does not exist.
    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: String },

    /// A field failed validation.
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// Two nodes share an id.
    #[error("Duplicate node id: {node_id}")]
    DuplicateId { node_id: String },
}

/// Backend API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend could not be reached after retrying.
    #[error("Backend unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    /// The backend answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The body could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// The request timed out.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Page controller errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PageError {
    /// Another operation holds the page.
    #[error("Another operation is in progress: {state}")]
    Busy { state: String },

    /// The operation needs a persisted tree.
    #[error("A persisted tree must be selected to {action}")]
    NoSelection { action: String },

    /// Nothing is loaded.
    #[error("No tree loaded")]
    NoTree,

    /// The operation needs an open node editor.
    #[error("No node editor is open")]
    NotEditing,
}

/// Coarse classification used to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parent, node or tree id did not resolve.
    NotFound,
    /// Local input rejected before reaching the network.
    Validation,
    /// Network or backend failure.
    Remote,
    /// Operation not allowed in the current page state.
    State,
    /// Startup configuration problem.
    Config,
}

impl AppError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config { .. } => ErrorKind::Config,
            AppError::Tree(TreeError::ParentNotFound { .. })
            | AppError::Tree(TreeError::NodeNotFound { .. }) => ErrorKind::NotFound,
            AppError::Tree(TreeError::Validation { .. })
            | AppError::Tree(TreeError::DuplicateId { .. }) => ErrorKind::Validation,
            AppError::Api(ApiError::Api { status: 404, .. }) => ErrorKind::NotFound,
            AppError::Api(_) => ErrorKind::Remote,
            AppError::Page(_) => ErrorKind::State,
            AppError::InvalidFile { .. } => ErrorKind::Validation,
        }
    }
}

impl ApiError {
    /// Whether the failure may clear up on its own (network, timeout, 5xx).
    /// Client errors and malformed bodies will not improve on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Api { status, .. } => *status >= 500,
            ApiError::InvalidResponse { .. } => false,
            ApiError::Unavailable { .. } | ApiError::Timeout { .. } | ApiError::Http(_) => true,
        }
    }
}

impl TreeError {
    /// Validation failure for a required text field.
    pub fn empty(field: &str) -> Self {
        TreeError::Validation {
            field: field.to_string(),
            reason: "cannot be empty".to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Result type alias for backend operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "bad url".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: bad url");

        let err = AppError::InvalidFile {
            path: "hechos.json".to_string(),
            message: "expected value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid input file hechos.json: expected value"
        );
    }

    #[test]
    fn test_tree_error_display() {
        let err = TreeError::ParentNotFound {
            parent_id: "n42".to_string(),
        };
        assert_eq!(err.to_string(), "Parent node not found: n42");

        let err = TreeError::NodeNotFound {
            node_id: "7".to_string(),
        };
        assert_eq!(err.to_string(), "Node not found: 7");

        assert_eq!(
            TreeError::empty("text").to_string(),
            "Validation failed: text - cannot be empty"
        );

        let err = TreeError::DuplicateId {
            node_id: "f3".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate node id: f3");
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Unavailable {
            message: "connection refused".to_string(),
            retries: 2,
        };
        assert_eq!(
            err.to_string(),
            "Backend unavailable: connection refused (retries: 2)"
        );

        let err = ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 500 - boom");

        let err = ApiError::Timeout { timeout_ms: 10000 };
        assert_eq!(err.to_string(), "Request timeout after 10000ms");
    }

    #[test]
    fn test_api_error_transient() {
        assert!(ApiError::Timeout { timeout_ms: 1 }.is_transient());
        assert!(ApiError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!ApiError::Api {
            status: 422,
            message: String::new()
        }
        .is_transient());
        assert!(!ApiError::InvalidResponse {
            message: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_page_error_display() {
        let err = PageError::NoSelection {
            action: "generate a tree".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "A persisted tree must be selected to generate a tree"
        );
        assert_eq!(PageError::NoTree.to_string(), "No tree loaded");
    }

    #[test]
    fn test_error_kind_classification() {
        let err: AppError = TreeError::ParentNotFound {
            parent_id: "x".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: AppError = TreeError::empty("text").into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: AppError = ApiError::Timeout { timeout_ms: 1 }.into();
        assert_eq!(err.kind(), ErrorKind::Remote);

        let err: AppError = ApiError::Api {
            status: 404,
            message: "missing".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: AppError = PageError::NotEditing.into();
        assert_eq!(err.kind(), ErrorKind::State);
    }
}
