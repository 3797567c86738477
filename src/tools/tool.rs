//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Stable machine-readable code for the wire error object.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::InvalidArgument(_) => "invalid_argument",
            ToolError::DivisionByZero(_) => "division_by_zero",
            ToolError::PermissionDenied(_) => "permission_denied",
            ToolError::NotFound(_) => "not_found",
            ToolError::Timeout(_) => "timeout",
            ToolError::Io(_) => "io_error",
        }
    }

    /// Whether retrying the same request could ever succeed. Everything
    /// client-caused is non-retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ToolError::Timeout(_) | ToolError::Io(_))
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result data.
    pub result: serde_json::Value,
    /// Time taken.
    pub duration: Duration,
}

impl ToolOutput {
    /// Create a successful output with a JSON result.
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Serialize a typed result into an output.
    pub fn from_serialize<T: Serialize>(value: &T, duration: Duration) -> Result<Self, ToolError> {
        let result = serde_json::to_value(value)
            .map_err(|e| ToolError::InvalidArgument(format!("unserializable result: {e}")))?;
        Ok(Self::success(result, duration))
    }
}

/// Definition of a tool's parameters using JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Trait for the callable operations the server exposes.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Cheap self-test used by the health surface.
    async fn health_check(&self) -> bool {
        true
    }

    /// Get the tool schema for listing.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Deserialize tool parameters into a typed request.
pub fn parse_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidArgument(e.to_string()))
}
