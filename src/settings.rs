//! Process-wide settings.
//!
//! Everything the core consumes is read once from the environment at startup
//! and treated as immutable for the process lifetime. The struct is passed by
//! reference into the services that need it; there is no global instance.

use std::path::PathBuf;

/// Default maximum file size for read/write (10 MiB).
const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum decimal precision the calculator will format to.
const DEFAULT_MAX_PRECISION: u32 = 15;

/// Default timeout for the search backend, in seconds.
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the tool server.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base directory for relative paths and the primary write sandbox.
    pub data_dir: PathBuf,
    /// Read-only assets directory, also inside the read sandbox.
    pub assets_dir: PathBuf,
    /// Directories file operations may read from.
    pub safe_read_dirs: Vec<PathBuf>,
    /// Directories file operations may write to / delete from.
    pub safe_write_dirs: Vec<PathBuf>,
    /// Maximum size of a file the executor will read or write, in bytes.
    pub max_file_size: u64,
    /// Extensions that are never allowed, whatever the allow-list says.
    pub blocked_extensions: Vec<String>,
    /// If non-empty, only these extensions are allowed.
    pub allowed_extensions: Vec<String>,
    /// Upper bound on calculator precision.
    pub max_precision: u32,
    /// Timeout applied around the search backend call.
    pub search_timeout: std::time::Duration,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    ///
    /// `ANVIL_DATA_DIR` / `ANVIL_ASSETS_DIR` override the directory layout;
    /// the default root lives under the platform data directory.
    pub fn from_env() -> Self {
        let root = std::env::var("ANVIL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_root().join("data"));
        let assets = std::env::var("ANVIL_ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_root().join("assets"));

        let max_file_size = env_parse("ANVIL_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE);
        let max_precision = env_parse("ANVIL_MAX_PRECISION", DEFAULT_MAX_PRECISION);
        let search_timeout_secs =
            env_parse("ANVIL_SEARCH_TIMEOUT_SECS", DEFAULT_SEARCH_TIMEOUT_SECS);

        Self::with_directories(root, assets)
            .max_file_size(max_file_size)
            .max_precision(max_precision)
            .search_timeout(std::time::Duration::from_secs(search_timeout_secs))
    }

    /// Build settings around an explicit directory pair. Used directly by
    /// tests; `from_env` funnels through here.
    pub fn with_directories(data_dir: PathBuf, assets_dir: PathBuf) -> Self {
        Self {
            safe_read_dirs: vec![data_dir.clone(), assets_dir.clone()],
            safe_write_dirs: vec![data_dir.clone()],
            data_dir,
            assets_dir,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            blocked_extensions: vec![
                ".exe".into(),
                ".bat".into(),
                ".sh".into(),
                ".cmd".into(),
            ],
            allowed_extensions: vec![
                ".txt".into(),
                ".json".into(),
                ".md".into(),
                ".py".into(),
                ".yaml".into(),
                ".yml".into(),
            ],
            max_precision: DEFAULT_MAX_PRECISION,
            search_timeout: std::time::Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
        }
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn max_precision(mut self, precision: u32) -> Self {
        self.max_precision = precision;
        self
    }

    pub fn search_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Create the sandbox directories if they are missing. Canonicalization
    /// in the sandbox requires them to exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in self.safe_read_dirs.iter().chain(&self.safe_write_dirs) {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anvil")
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
