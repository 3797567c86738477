//! Input validation for tool requests.
//!
//! Validation is pure: each rule is an independent predicate and every
//! violated rule is collected, so a caller can fix all problems in one round
//! trip instead of playing whack-a-mole with the first error.

use crate::models::{CalcOperation, CalculationRequest, FileOperationRequest, SearchQuery};
use crate::tools::ToolError;

/// Result of validating a request.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the input is valid.
    pub is_valid: bool,
    /// Every rule the input violated.
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a passing validation result.
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create a validation result with a single error.
    pub fn error(error: ValidationError) -> Self {
        Self {
            is_valid: false,
            errors: vec![error],
        }
    }

    /// Merge another validation result into this one.
    pub fn merge(mut self, other: Self) -> Self {
        self.is_valid = self.is_valid && other.is_valid;
        self.errors.extend(other.errors);
        self
    }

    /// Convert into a tool error listing every violation, or `Ok` if valid.
    pub fn into_result(self) -> Result<(), ToolError> {
        if self.is_valid {
            return Ok(());
        }
        let combined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ToolError::InvalidArgument(combined))
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// A single violated rule.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Human-readable message.
    pub message: String,
    /// Code for programmatic handling.
    pub code: ValidationErrorCode,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>, code: ValidationErrorCode) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            code,
        }
    }
}

/// Error codes for validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    Empty,
    OutOfRange,
    WrongArity,
    DivisionByZero,
    NonFinite,
    Traversal,
    Missing,
    TooLarge,
    InvalidFormat,
}

/// Maximum number of operands per calculation.
const MAX_NUMBERS: usize = 10;

/// Maximum formatting precision accepted from callers.
const MAX_PRECISION: u32 = 15;

/// Maximum path length in characters.
const MAX_PATH_LEN: usize = 500;

/// Maximum write content length in characters.
const MAX_CONTENT_CHARS: usize = 1_000_000;

/// Maximum search text length in characters.
const MAX_SEARCH_TEXT: usize = 1000;

/// Maximum number of domain filters per search.
const MAX_SEARCH_DOMAINS: usize = 10;

/// Maximum number of search results a caller may request.
const MAX_SEARCH_LIMIT: u32 = 100;

/// Validate a calculation request against all field and cross-field rules.
pub fn validate_calculation(req: &CalculationRequest) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if req.numbers.is_empty() || req.numbers.len() > MAX_NUMBERS {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "numbers",
            format!(
                "numbers count out of bounds: {} (expected 1..={})",
                req.numbers.len(),
                MAX_NUMBERS
            ),
            ValidationErrorCode::OutOfRange,
        )));
    }

    if req.precision > MAX_PRECISION {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "precision",
            format!("precision out of range: {} (max {})", req.precision, MAX_PRECISION),
            ValidationErrorCode::OutOfRange,
        )));
    }

    if req.operation.is_binary() && req.numbers.len() != 2 {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "numbers",
            format!("binary operation {} requires exactly 2 numbers", req.operation),
            ValidationErrorCode::WrongArity,
        )));
    }

    // Duplicated in the engine as a defensive invariant.
    if matches!(req.operation, CalcOperation::Divide | CalcOperation::Modulo)
        && req.numbers.get(1).is_some_and(|d| *d == 0.0)
    {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "numbers",
            "division by zero",
            ValidationErrorCode::DivisionByZero,
        )));
    }

    for (i, n) in req.numbers.iter().enumerate() {
        if !n.is_finite() {
            result = result.merge(ValidationResult::error(ValidationError::new(
                "numbers",
                format!("non-finite value at index {i}"),
                ValidationErrorCode::NonFinite,
            )));
        }
    }

    result
}

/// Validate a file operation request. Path *authorization* (canonical
/// resolution, sandbox descendance) happens later in the sandbox; this layer
/// only applies the pure string-level rules.
pub fn validate_file_request(req: &FileOperationRequest) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if req.path.trim().is_empty() {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "path",
            "path cannot be empty",
            ValidationErrorCode::Empty,
        )));
    } else {
        // Bound is in characters, not bytes; multibyte names count once.
        let path_chars = req.path.chars().count();
        if path_chars > MAX_PATH_LEN {
            result = result.merge(ValidationResult::error(ValidationError::new(
                "path",
                format!("path too long: {path_chars} chars (max {MAX_PATH_LEN})"),
                ValidationErrorCode::TooLarge,
            )));
        }
    }

    if has_parent_segment(&req.path) || is_absolute_like(&req.path) {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "path",
            "path traversal not allowed",
            ValidationErrorCode::Traversal,
        )));
    }

    if req.operation == crate::models::FileOperation::Write && req.content.is_none() {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "content",
            "content required for write",
            ValidationErrorCode::Missing,
        )));
    }

    if let Some(content) = &req.content {
        let chars = content.chars().count();
        if chars > MAX_CONTENT_CHARS {
            result = result.merge(ValidationResult::error(ValidationError::new(
                "content",
                format!("content too large: {chars} chars (max {MAX_CONTENT_CHARS})"),
                ValidationErrorCode::TooLarge,
            )));
        }
    }

    result
}

/// Validate a search query.
pub fn validate_search(query: &SearchQuery) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if query.text.trim().is_empty() {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "text",
            "search text cannot be empty",
            ValidationErrorCode::Empty,
        )));
    } else if query.text.len() > MAX_SEARCH_TEXT {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "text",
            format!("search text too long (max {MAX_SEARCH_TEXT} chars)"),
            ValidationErrorCode::TooLarge,
        )));
    }

    if query.limit == 0 || query.limit > MAX_SEARCH_LIMIT {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "limit",
            format!("limit out of range: {} (expected 1..={})", query.limit, MAX_SEARCH_LIMIT),
            ValidationErrorCode::OutOfRange,
        )));
    }

    if query.language.len() < 2 || query.language.len() > 5 {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "language",
            "language must be a 2-5 character code",
            ValidationErrorCode::InvalidFormat,
        )));
    }

    if query.domains.len() > MAX_SEARCH_DOMAINS {
        result = result.merge(ValidationResult::error(ValidationError::new(
            "domains",
            format!("too many domain filters (max {MAX_SEARCH_DOMAINS})"),
            ValidationErrorCode::TooLarge,
        )));
    }
    for domain in &query.domains {
        if domain.is_empty() || !domain.contains('.') {
            result = result.merge(ValidationResult::error(ValidationError::new(
                "domains",
                format!("invalid domain format: {domain:?}"),
                ValidationErrorCode::InvalidFormat,
            )));
        }
    }

    result
}

/// Whether any segment of the raw path is a parent-directory marker.
fn has_parent_segment(path: &str) -> bool {
    std::path::Path::new(path)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

/// Absolute paths in either separator family are rejected before resolution.
fn is_absolute_like(path: &str) -> bool {
    std::path::Path::new(path).is_absolute() || path.starts_with('/') || path.starts_with('\\')
}
