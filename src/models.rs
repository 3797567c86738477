//! Request and response models for the tool surface.
//!
//! All types cross the dispatcher boundary as JSON, so everything here
//! derives serde with lowercase wire names for the enums.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Arithmetic operations supported by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
}

impl CalcOperation {
    /// Operations that take exactly two operands.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            CalcOperation::Subtract
                | CalcOperation::Divide
                | CalcOperation::Power
                | CalcOperation::Modulo
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CalcOperation::Add => "add",
            CalcOperation::Subtract => "subtract",
            CalcOperation::Multiply => "multiply",
            CalcOperation::Divide => "divide",
            CalcOperation::Power => "power",
            CalcOperation::Modulo => "modulo",
        }
    }
}

impl std::fmt::Display for CalcOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single calculation request. Transient: validated, executed, discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub operation: CalcOperation,
    pub numbers: Vec<f64>,
    #[serde(default = "default_precision")]
    pub precision: u32,
}

fn default_precision() -> u32 {
    2
}

/// Result of a calculation, echoing the inputs that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub result: Decimal,
    pub operation: CalcOperation,
    pub input_numbers: Vec<f64>,
    pub formatted: String,
}

/// Filesystem operations supported by the file manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Read,
    Write,
    List,
    Exists,
    Delete,
}

impl FileOperation {
    /// Operations that mutate the filesystem and need write authorization.
    pub fn mutates(self) -> bool {
        matches!(self, FileOperation::Write | FileOperation::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileOperation::Read => "read",
            FileOperation::Write => "write",
            FileOperation::List => "list",
            FileOperation::Exists => "exists",
            FileOperation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file operation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOperationRequest {
    pub operation: FileOperation,
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

/// Metadata for one filesystem entry, computed at the moment of the
/// operation and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_directory: bool,
    pub modified: DateTime<Utc>,
    pub readable: bool,
    pub writable: bool,
}

/// Structured outcome of a file operation.
///
/// Expected failures (missing file, size limit, non-empty directory) land
/// here with `success: false` instead of erroring across the tool boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOperationResult {
    pub operation: FileOperation,
    pub path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<FileEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<FileEntry>,
    pub message: String,
}

impl FileOperationResult {
    /// A bare successful result with a message; payload fields start empty.
    pub fn ok(operation: FileOperation, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            success: true,
            content: None,
            entries: None,
            entry: None,
            message: message.into(),
        }
    }

    /// An expected failure, reported in-band.
    pub fn failed(
        operation: FileOperation,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            path: path.into(),
            success: false,
            content: None,
            entries: None,
            entry: None,
            message: message.into(),
        }
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_entries(mut self, entries: Vec<FileEntry>) -> Self {
        self.entries = Some(entries);
        self
    }

    pub fn with_entry(mut self, entry: FileEntry) -> Self {
        self.entry = Some(entry);
        self
    }
}

/// A web search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_search_limit() -> u32 {
    10
}

fn default_language() -> String {
    "en".to_string()
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Search results with the query echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_wire_names_are_lowercase() {
        let op: CalcOperation = serde_json::from_str("\"divide\"").unwrap();
        assert_eq!(op, CalcOperation::Divide);
        assert_eq!(serde_json::to_string(&FileOperation::Delete).unwrap(), "\"delete\"");
    }

    #[test]
    fn calculation_request_defaults_precision() {
        let req: CalculationRequest =
            serde_json::from_str(r#"{"operation":"add","numbers":[1,2]}"#).unwrap();
        assert_eq!(req.precision, 2);
    }

    #[test]
    fn file_request_defaults_encoding() {
        let req: FileOperationRequest =
            serde_json::from_str(r#"{"operation":"read","path":"a.txt"}"#).unwrap();
        assert_eq!(req.encoding, "utf-8");
        assert!(req.content.is_none());
    }

    #[test]
    fn binary_classification() {
        assert!(CalcOperation::Subtract.is_binary());
        assert!(CalcOperation::Modulo.is_binary());
        assert!(!CalcOperation::Add.is_binary());
        assert!(!CalcOperation::Multiply.is_binary());
    }

    #[test]
    fn search_query_defaults() {
        let q: SearchQuery = serde_json::from_str(r#"{"text":"rust"}"#).unwrap();
        assert_eq!(q.limit, 10);
        assert_eq!(q.language, "en");
        assert!(q.domains.is_empty());
    }
}
