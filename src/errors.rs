use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Failed to fetch from catalog: {url} (status: {status})")]
    CatalogUnavailable { url: String, status: u16 },

    #[error("Catalog request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed catalog document at {url}: {message}")]
    MalformedDocument { url: String, message: String },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache value could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Dependency cycle detected: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },
}

/// Failure of a single tool invocation. Rendered as an `isError` tool
/// result rather than a JSON-RPC error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("Failed to encode tool result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    pub fn invalid_arguments(tool: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool,
            message: message.into(),
        }
    }

    /// JSON-RPC style code carried inside the error payload.
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidArguments { .. } | Self::UnknownTool(_) => -32602,
            Self::Catalog(CatalogError::PatternNotFound(_)) => -32004,
            Self::Catalog(_) => -32003,
            Self::Sequence(_) => -32020,
            Self::Serialization(_) => -32603,
        }
    }

    /// Failures of the server itself rather than of the caller's request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}
