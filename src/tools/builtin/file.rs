//! Sandboxed file operations.
//!
//! `FileManager` executes read/write/list/exists/delete against paths that
//! the sandbox has already authorized; it never authorizes anything itself.
//! Expected failures (missing files, size limits, non-empty directories)
//! come back in-band as `success: false` results. Unexpected OS faults
//! propagate as `ToolError::Io`.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::models::{FileEntry, FileOperation, FileOperationRequest, FileOperationResult};
use crate::tools::sandbox::PathSandbox;
use crate::tools::tool::{parse_params, Tool, ToolError, ToolOutput};
use crate::validate::validate_file_request;

/// Text encodings the executor understands.
///
/// Decode failures with UTF-8 retry once with latin-1, which never fails but
/// may garble genuinely binary data. That fallback mirrors long-standing
/// behavior and is kept as a known rough edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String, String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| format!("invalid utf-8: {e}")),
            Encoding::Latin1 => Ok(bytes.iter().map(|b| *b as char).collect()),
        }
    }

    fn encode(self, content: &str) -> Result<Vec<u8>, String> {
        match self {
            Encoding::Utf8 => Ok(content.as_bytes().to_vec()),
            Encoding::Latin1 => content
                .chars()
                .map(|c| {
                    let cp = c as u32;
                    if cp <= 0xFF {
                        Ok(cp as u8)
                    } else {
                        Err(format!("character {c:?} not representable in latin-1"))
                    }
                })
                .collect(),
        }
    }
}

/// Executes file operations on authorized paths.
pub struct FileManager {
    sandbox: PathSandbox,
    max_file_size: u64,
}

impl FileManager {
    pub fn new(sandbox: PathSandbox, max_file_size: u64) -> Self {
        Self {
            sandbox,
            max_file_size,
        }
    }

    /// Authorize the path, then perform the requested operation.
    pub async fn execute(
        &self,
        req: &FileOperationRequest,
    ) -> Result<FileOperationResult, ToolError> {
        let path = self.sandbox.authorize(&req.path, req.operation)?;

        match req.operation {
            FileOperation::Read => self.read(&path, &req.encoding).await,
            FileOperation::Write => self.write(&path, req.content.as_deref(), &req.encoding).await,
            FileOperation::List => self.list(&path).await,
            FileOperation::Exists => self.exists(&path).await,
            FileOperation::Delete => self.delete(&path).await,
        }
    }

    async fn read(&self, path: &Path, encoding: &str) -> Result<FileOperationResult, ToolError> {
        let display_path = path.display().to_string();

        let meta = match fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileOperationResult::failed(
                    FileOperation::Read,
                    display_path,
                    "file not found",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if !meta.is_file() {
            return Ok(FileOperationResult::failed(
                FileOperation::Read,
                display_path,
                "path is not a regular file",
            ));
        }
        if meta.len() > self.max_file_size {
            return Ok(FileOperationResult::failed(
                FileOperation::Read,
                display_path,
                format!(
                    "file too large: {} bytes (max {})",
                    meta.len(),
                    self.max_file_size
                ),
            ));
        }

        let Some(enc) = Encoding::parse(encoding) else {
            return Ok(FileOperationResult::failed(
                FileOperation::Read,
                display_path,
                format!("unsupported encoding: {encoding}"),
            ));
        };

        let bytes = match fs::read(path).await {
            Ok(b) => b,
            // File vanished between the stat and the read.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileOperationResult::failed(
                    FileOperation::Read,
                    display_path,
                    "file not found",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        match enc.decode(&bytes) {
            Ok(content) => {
                let chars = content.chars().count();
                tracing::info!(path = %display_path, chars, "read file");
                Ok(
                    FileOperationResult::ok(
                        FileOperation::Read,
                        display_path,
                        format!("read {chars} characters"),
                    )
                    .with_content(content),
                )
            }
            Err(_) => {
                // Fallback decode cannot fail; it may mangle binary input.
                let content = Encoding::Latin1
                    .decode(&bytes)
                    .unwrap_or_default();
                let chars = content.chars().count();
                tracing::warn!(path = %display_path, "decoded with fallback encoding");
                Ok(
                    FileOperationResult::ok(
                        FileOperation::Read,
                        display_path,
                        format!("read with fallback encoding ({chars} characters)"),
                    )
                    .with_content(content),
                )
            }
        }
    }

    async fn write(
        &self,
        path: &Path,
        content: Option<&str>,
        encoding: &str,
    ) -> Result<FileOperationResult, ToolError> {
        let display_path = path.display().to_string();

        // The validator already requires content; re-checked so the executor
        // is safe on its own.
        let Some(content) = content else {
            return Ok(FileOperationResult::failed(
                FileOperation::Write,
                display_path,
                "content required for write",
            ));
        };

        let Some(enc) = Encoding::parse(encoding) else {
            return Ok(FileOperationResult::failed(
                FileOperation::Write,
                display_path,
                format!("unsupported encoding: {encoding}"),
            ));
        };

        let bytes = match enc.encode(content) {
            Ok(b) => b,
            Err(msg) => {
                return Ok(FileOperationResult::failed(
                    FileOperation::Write,
                    display_path,
                    msg,
                ));
            }
        };

        if bytes.len() as u64 > self.max_file_size {
            return Ok(FileOperationResult::failed(
                FileOperation::Write,
                display_path,
                format!(
                    "content too large: {} bytes (max {})",
                    bytes.len(),
                    self.max_file_size
                ),
            ));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temp sibling and rename so a concurrent reader never
        // observes a partially written file.
        let tmp = temp_sibling(path);
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(path = %display_path, bytes = bytes.len(), "wrote file");
        Ok(FileOperationResult::ok(
            FileOperation::Write,
            display_path,
            format!("wrote {} bytes", bytes.len()),
        ))
    }

    async fn list(&self, path: &Path) -> Result<FileOperationResult, ToolError> {
        let display_path = path.display().to_string();

        let mut dir = match fs::read_dir(path).await {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileOperationResult::failed(
                    FileOperation::List,
                    display_path,
                    "directory not found",
                ));
            }
            Err(e) if e.kind() == ErrorKind::NotADirectory => {
                return Ok(FileOperationResult::failed(
                    FileOperation::List,
                    display_path,
                    "path is not a directory",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            entries.push(entry_info(&entry.path()).await);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let count = entries.len();
        tracing::info!(path = %display_path, count, "listed directory");
        Ok(
            FileOperationResult::ok(
                FileOperation::List,
                display_path,
                format!("found {count} items"),
            )
            .with_entries(entries),
        )
    }

    async fn exists(&self, path: &Path) -> Result<FileOperationResult, ToolError> {
        let display_path = path.display().to_string();

        match fs::metadata(path).await {
            Ok(_) => {
                let entry = entry_info(path).await;
                Ok(
                    FileOperationResult::ok(FileOperation::Exists, display_path, "path exists")
                        .with_entry(entry),
                )
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileOperationResult::ok(
                FileOperation::Exists,
                display_path,
                "path does not exist",
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &Path) -> Result<FileOperationResult, ToolError> {
        let display_path = path.display().to_string();

        let meta = match fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileOperationResult::failed(
                    FileOperation::Delete,
                    display_path,
                    "path not found",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir() {
            let mut dir = fs::read_dir(path).await?;
            if dir.next_entry().await?.is_some() {
                return Ok(FileOperationResult::failed(
                    FileOperation::Delete,
                    display_path,
                    "directory not empty (safety restriction)",
                ));
            }
            fs::remove_dir(path).await?;
            tracing::info!(path = %display_path, "deleted empty directory");
            Ok(FileOperationResult::ok(
                FileOperation::Delete,
                display_path,
                "empty directory deleted",
            ))
        } else {
            fs::remove_file(path).await?;
            tracing::info!(path = %display_path, "deleted file");
            Ok(FileOperationResult::ok(
                FileOperation::Delete,
                display_path,
                "file deleted",
            ))
        }
    }

    /// Round-trip probe through the sandboxed pipeline.
    pub async fn health_check(&self) -> bool {
        let probe = "health_check.txt";
        let write = FileOperationRequest {
            operation: FileOperation::Write,
            path: probe.to_string(),
            content: Some("health check".to_string()),
            encoding: "utf-8".to_string(),
        };
        let read = FileOperationRequest {
            operation: FileOperation::Read,
            path: probe.to_string(),
            content: None,
            encoding: "utf-8".to_string(),
        };
        let delete = FileOperationRequest {
            operation: FileOperation::Delete,
            path: probe.to_string(),
            content: None,
            encoding: "utf-8".to_string(),
        };

        let wrote = matches!(self.execute(&write).await, Ok(r) if r.success);
        let read_back = matches!(
            self.execute(&read).await,
            Ok(r) if r.success && r.content.as_deref() == Some("health check")
        );
        let deleted = matches!(self.execute(&delete).await, Ok(r) if r.success);
        wrote && read_back && deleted
    }
}

/// Temp-file name next to the target, unique enough per process.
fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{name}.{}.tmp", std::process::id()))
}

/// Snapshot metadata for one entry. Computed fresh every call.
async fn entry_info(path: &Path) -> FileEntry {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);
            FileEntry {
                name,
                path: path.display().to_string(),
                size: meta.len(),
                is_directory: meta.is_dir(),
                modified,
                readable: true,
                writable: !meta.permissions().readonly(),
            }
        }
        // Entry vanished mid-listing; report what little is still known.
        Err(_) => FileEntry {
            name,
            path: path.display().to_string(),
            size: 0,
            is_directory: false,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            readable: false,
            writable: false,
        },
    }
}

/// Tool wrapper: validation, then sandboxed execution.
pub struct FileTool {
    manager: FileManager,
}

impl FileTool {
    pub fn new(manager: FileManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for FileTool {
    fn name(&self) -> &str {
        "manage_file"
    }

    fn description(&self) -> &str {
        "Perform sandboxed file operations (read, write, list, exists, delete) \
         on paths relative to the server data directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["read", "write", "list", "exists", "delete"],
                    "description": "File operation to perform"
                },
                "path": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": 500,
                    "description": "Path relative to the data directory; no absolute paths or '..'"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write (required for write operations)"
                },
                "encoding": {
                    "type": "string",
                    "default": "utf-8",
                    "description": "Text encoding: utf-8 or latin-1"
                }
            },
            "required": ["operation", "path"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let request: FileOperationRequest = parse_params(params)?;

        validate_file_request(&request).into_result()?;

        let result = self.manager.execute(&request).await?;
        tracing::info!(
            operation = %request.operation,
            success = result.success,
            message = %result.message,
            "file operation completed"
        );

        ToolOutput::from_serialize(&result, start.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.manager.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn manager(tmp: &TempDir) -> FileManager {
        let settings = Settings::with_directories(
            tmp.path().join("data"),
            tmp.path().join("assets"),
        );
        settings.ensure_directories().unwrap();
        let sandbox = PathSandbox::from_settings(&settings);
        FileManager::new(sandbox, settings.max_file_size)
    }

    fn req(operation: FileOperation, path: &str) -> FileOperationRequest {
        FileOperationRequest {
            operation,
            path: path.to_string(),
            content: None,
            encoding: "utf-8".to_string(),
        }
    }

    fn write_req(path: &str, content: &str) -> FileOperationRequest {
        FileOperationRequest {
            operation: FileOperation::Write,
            path: path.to_string(),
            content: Some(content.to_string()),
            encoding: "utf-8".to_string(),
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        let result = fm.execute(&write_req("demo.txt", "hello")).await.unwrap();
        assert!(result.success, "{}", result.message);

        let result = fm.execute(&req(FileOperation::Read, "demo.txt")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        let result = fm
            .execute(&write_req("a/b/c/deep.txt", "nested"))
            .await
            .unwrap();
        assert!(result.success);

        let result = fm
            .execute(&req(FileOperation::Read, "a/b/c/deep.txt"))
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("nested"));
    }

    #[tokio::test]
    async fn write_leaves_no_temp_residue() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        fm.execute(&write_req("clean.txt", "v1")).await.unwrap();
        fm.execute(&write_req("clean.txt", "v2")).await.unwrap();

        let listing = fm.execute(&req(FileOperation::List, ".")).await.unwrap();
        let names: Vec<_> = listing
            .entries
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");

        let result = fm.execute(&req(FileOperation::Read, "clean.txt")).await.unwrap();
        assert_eq!(result.content.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn read_missing_file_is_in_band_failure() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        let result = fm.execute(&req(FileOperation::Read, "ghost.txt")).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn read_rejects_oversized_files() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::with_directories(
            tmp.path().join("data"),
            tmp.path().join("assets"),
        )
        .max_file_size(8);
        settings.ensure_directories().unwrap();
        let fm = FileManager::new(PathSandbox::from_settings(&settings), settings.max_file_size);

        std::fs::write(settings.data_dir.join("big.txt"), "more than eight bytes").unwrap();

        let result = fm.execute(&req(FileOperation::Read, "big.txt")).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("too large"));
    }

    #[tokio::test]
    async fn invalid_utf8_falls_back_to_latin1() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        // 0xE9 is 'é' in latin-1 and invalid standalone UTF-8.
        std::fs::write(
            tmp.path().join("data").join("legacy.txt"),
            [0x63u8, 0x61, 0x66, 0xE9],
        )
        .unwrap();

        let result = fm.execute(&req(FileOperation::Read, "legacy.txt")).await.unwrap();
        assert!(result.success);
        assert!(result.message.contains("fallback"));
        assert_eq!(result.content.as_deref(), Some("café"));
    }

    #[tokio::test]
    async fn unknown_encoding_is_in_band_failure() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        fm.execute(&write_req("x.txt", "hi")).await.unwrap();

        let mut request = req(FileOperation::Read, "x.txt");
        request.encoding = "ebcdic".to_string();
        let result = fm.execute(&request).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("unsupported encoding"));
    }

    #[tokio::test]
    async fn list_returns_entries_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        fm.execute(&write_req("dir/b.txt", "b")).await.unwrap();
        fm.execute(&write_req("dir/a.txt", "a")).await.unwrap();

        let result = fm.execute(&req(FileOperation::List, "dir")).await.unwrap();
        assert!(result.success);
        let names: Vec<_> = result
            .entries
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn list_entries_carry_metadata() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        fm.execute(&write_req("meta/file.txt", "12345")).await.unwrap();

        let result = fm.execute(&req(FileOperation::List, "meta")).await.unwrap();
        let entries = result.entries.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 5);
        assert!(!entries[0].is_directory);
        assert!(entries[0].readable);
    }

    #[tokio::test]
    async fn list_missing_directory_fails_in_band() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        let result = fm.execute(&req(FileOperation::List, "nowhere")).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn exists_is_idempotent_and_never_mutates() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        fm.execute(&write_req("stable.txt", "x")).await.unwrap();

        for _ in 0..3 {
            let result = fm.execute(&req(FileOperation::Exists, "stable.txt")).await.unwrap();
            assert!(result.success);
            assert!(result.entry.is_some());
            assert_eq!(result.message, "path exists");
        }

        let result = fm.execute(&req(FileOperation::Exists, "missing.txt")).await.unwrap();
        assert!(result.success);
        assert!(result.entry.is_none());
        assert_eq!(result.message, "path does not exist");
    }

    #[tokio::test]
    async fn delete_refuses_non_empty_directories() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        fm.execute(&write_req("full/keep.txt", "x")).await.unwrap();

        let result = fm.execute(&req(FileOperation::Delete, "full")).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("not empty"));
    }

    #[tokio::test]
    async fn delete_empty_directory_then_gone() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        std::fs::create_dir(tmp.path().join("data").join("hollow")).unwrap();

        let result = fm.execute(&req(FileOperation::Delete, "hollow")).await.unwrap();
        assert!(result.success, "{}", result.message);

        let result = fm.execute(&req(FileOperation::Exists, "hollow")).await.unwrap();
        assert!(result.entry.is_none());
    }

    #[tokio::test]
    async fn delete_file_and_missing_path() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        fm.execute(&write_req("gone.txt", "x")).await.unwrap();

        let result = fm.execute(&req(FileOperation::Delete, "gone.txt")).await.unwrap();
        assert!(result.success);

        let result = fm.execute(&req(FileOperation::Delete, "gone.txt")).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn sandbox_errors_cross_the_boundary() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);

        let err = fm
            .execute(&req(FileOperation::Read, "../../../etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn health_check_round_trips() {
        let tmp = TempDir::new().unwrap();
        let fm = manager(&tmp);
        assert!(fm.health_check().await);
    }

    #[tokio::test]
    async fn tool_write_then_read_demo() {
        let tmp = TempDir::new().unwrap();
        let tool = FileTool::new(manager(&tmp));

        let out = tool
            .execute(serde_json::json!({
                "operation": "write",
                "path": "demo.txt",
                "content": "hello"
            }))
            .await
            .unwrap();
        assert_eq!(out.result.get("success").unwrap(), true);

        let out = tool
            .execute(serde_json::json!({
                "operation": "read",
                "path": "demo.txt"
            }))
            .await
            .unwrap();
        assert_eq!(out.result.get("content").unwrap(), "hello");
        assert_eq!(out.result.get("success").unwrap(), true);
    }

    #[tokio::test]
    async fn tool_rejects_traversal_before_execution() {
        let tmp = TempDir::new().unwrap();
        let tool = FileTool::new(manager(&tmp));

        for path in ["../../../etc/passwd", "data/../../../secrets.txt", "/etc/passwd"] {
            let err = tool
                .execute(serde_json::json!({
                    "operation": "read",
                    "path": path
                }))
                .await
                .unwrap_err();
            assert!(
                err.to_string().contains("traversal"),
                "{path}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn tool_requires_content_for_write() {
        let tmp = TempDir::new().unwrap();
        let tool = FileTool::new(manager(&tmp));

        let err = tool
            .execute(serde_json::json!({
                "operation": "write",
                "path": "demo.txt"
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("content required"));
    }
}
