//! Path sandboxing for file operations.
//!
//! The sandbox is the security gate between user-supplied path strings and
//! the filesystem. It resolves paths relative to a fixed base directory,
//! canonicalizes them (symlinks included), and only then checks descendance
//! against the configured safe roots. String prefix matching is never used
//! for the containment check.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::models::FileOperation;
use crate::settings::Settings;
use crate::tools::tool::ToolError;

/// Authorizes paths against directory allow-lists and extension policy.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    /// Base directory that relative paths resolve against.
    base_dir: PathBuf,
    /// Canonical roots readable by any operation.
    read_roots: Vec<PathBuf>,
    /// Canonical roots where write/delete is allowed.
    write_roots: Vec<PathBuf>,
    blocked_extensions: HashSet<String>,
    allowed_extensions: HashSet<String>,
}

impl PathSandbox {
    /// Build a sandbox from settings. Roots are canonicalized up front so
    /// descendance checks compare like with like; roots that do not exist
    /// yet are kept as configured.
    pub fn from_settings(settings: &Settings) -> Self {
        let canon = |p: &PathBuf| p.canonicalize().unwrap_or_else(|_| p.clone());
        Self {
            base_dir: canon(&settings.data_dir),
            read_roots: settings.safe_read_dirs.iter().map(canon).collect(),
            write_roots: settings.safe_write_dirs.iter().map(canon).collect(),
            blocked_extensions: settings
                .blocked_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            allowed_extensions: settings
                .allowed_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Resolve and authorize a user-supplied path for the given operation.
    ///
    /// Returns the canonical absolute path on success. Rejections never leak
    /// the resolved host path in the error message.
    pub fn authorize(&self, path_str: &str, operation: FileOperation) -> Result<PathBuf, ToolError> {
        if path_str.trim().is_empty() {
            return Err(ToolError::InvalidArgument("path cannot be empty".into()));
        }

        let raw = Path::new(path_str);
        if raw.is_absolute() || path_str.starts_with('/') || path_str.starts_with('\\') {
            return Err(ToolError::InvalidArgument("path traversal not allowed".into()));
        }
        if raw.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ToolError::InvalidArgument("path traversal not allowed".into()));
        }

        let resolved = self.resolve(raw)?;

        // Canonicalization must have eliminated every parent marker.
        if resolved.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ToolError::InvalidArgument("path traversal not allowed".into()));
        }

        if !self.read_roots.iter().any(|root| resolved.starts_with(root)) {
            tracing::warn!(path = path_str, "rejected path outside safe directories");
            return Err(ToolError::PermissionDenied("outside safe directories".into()));
        }

        if operation.mutates() && !self.write_roots.iter().any(|root| resolved.starts_with(root)) {
            tracing::warn!(path = path_str, %operation, "rejected write outside write roots");
            return Err(ToolError::PermissionDenied("write access denied".into()));
        }

        self.check_extension(&resolved)?;

        Ok(resolved)
    }

    /// Canonicalize `base_dir.join(relative)`. Paths that do not exist yet
    /// canonicalize their deepest existing ancestor and re-append the rest,
    /// so a symlinked ancestor cannot smuggle the target outside the roots.
    fn resolve(&self, relative: &Path) -> Result<PathBuf, ToolError> {
        let joined = self.base_dir.join(relative);
        if joined.exists() {
            return joined
                .canonicalize()
                .map_err(|e| ToolError::InvalidArgument(format!("invalid path: {e}")));
        }

        let mut existing = joined.clone();
        let mut tail: Vec<std::ffi::OsString> = Vec::new();
        while !existing.exists() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    tail.push(name.to_os_string());
                    existing = parent.to_path_buf();
                }
                _ => return Err(ToolError::InvalidArgument("invalid path format".into())),
            }
        }

        let mut resolved = existing
            .canonicalize()
            .map_err(|e| ToolError::InvalidArgument(format!("invalid path: {e}")))?;
        for name in tail.iter().rev() {
            resolved.push(name);
        }
        Ok(resolved)
    }

    /// Apply the extension block-list, then the allow-list if one is set.
    fn check_extension(&self, path: &Path) -> Result<(), ToolError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Ok(());
        };
        let dotted = format!(".{}", ext.to_lowercase());

        if self.blocked_extensions.contains(&dotted) {
            return Err(ToolError::InvalidArgument(format!(
                "extension not allowed: {dotted}"
            )));
        }
        if !self.allowed_extensions.is_empty() && !self.allowed_extensions.contains(&dotted) {
            return Err(ToolError::InvalidArgument(format!(
                "extension not allowed: {dotted}"
            )));
        }
        Ok(())
    }

    /// The canonical base directory relative paths resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
