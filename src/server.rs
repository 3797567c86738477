//! Line-delimited JSON dispatcher.
//!
//! The thin host layer the tools sit behind: one JSON request per line on
//! stdin, one JSON response per line on stdout. Requests name a tool and
//! carry its parameters; the reserved names `__schemas`, `__health` and
//! `__info` expose the registry listing, component health and server
//! metadata.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::settings::Settings;
use crate::tools::{ToolError, ToolRegistry};

/// One incoming call.
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    params: Value,
}

/// Dispatches requests to registered tools.
pub struct Server {
    registry: ToolRegistry,
    settings: Settings,
    started_at: std::time::Instant,
}

impl Server {
    pub fn new(registry: ToolRegistry, settings: Settings) -> Self {
        Self {
            registry,
            settings,
            started_at: std::time::Instant::now(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw request line and produce the response value.
    pub async fn handle(&self, line: &str) -> Value {
        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                return error_response(
                    Value::Null,
                    "invalid_argument",
                    &format!("malformed request: {e}"),
                );
            }
        };

        match request.tool.as_str() {
            "__schemas" => json!({
                "id": request.id,
                "ok": true,
                "result": { "tools": self.registry.schemas() },
            }),
            "__health" => {
                let checks = self.registry.health().await;
                let healthy = checks.values().all(|ok| *ok);
                json!({
                    "id": request.id,
                    "ok": true,
                    "result": {
                        "status": if healthy { "healthy" } else { "degraded" },
                        "checks": checks,
                    },
                })
            }
            "__info" => json!({
                "id": request.id,
                "ok": true,
                "result": self.info(),
            }),
            name => match self.registry.get(name) {
                Some(tool) => match tool.execute(request.params).await {
                    Ok(output) => json!({
                        "id": request.id,
                        "ok": true,
                        "result": output.result,
                    }),
                    Err(err) => {
                        tracing::debug!(tool = name, code = err.code(), %err, "tool call failed");
                        error_response(request.id, err.code(), &err.to_string())
                    }
                },
                None => error_response(
                    request.id,
                    ToolError::NotFound(String::new()).code(),
                    &format!("unknown tool: {name}"),
                ),
            },
        }
    }

    /// Server identity plus the configuration subset that is safe to show
    /// to callers. Directory layout stays private; only numeric limits and
    /// the extension policy go over the wire.
    fn info(&self) -> Value {
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "status": "running",
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "tools": self.registry.len(),
            "config": {
                "limits": {
                    "max_file_size": self.settings.max_file_size,
                    "max_precision": self.settings.max_precision,
                },
                "search": {
                    "timeout_secs": self.settings.search_timeout.as_secs(),
                },
                "extensions": {
                    "allowed": &self.settings.allowed_extensions,
                    "blocked": &self.settings.blocked_extensions,
                },
            },
        })
    }

    /// Serve requests from stdin until EOF.
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        tracing::info!(tools = self.registry.len(), "server ready on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle(&line).await;
            let mut bytes = serde_json::to_vec(&response)?;
            bytes.push(b'\n');
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }
}

fn error_response(id: Value, code: &str, message: &str) -> Value {
    json!({
        "id": id,
        "ok": false,
        "error": { "code": code, "message": message },
    })
}
