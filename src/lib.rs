//! Sandboxed tool server for local tool-testing and demonstration.
//!
//! Exposes three callable operations over a structured request/response
//! protocol: decimal arithmetic (`calculate`), sandboxed file access
//! (`manage_file`), and a stub web search (`search_web`). The interesting
//! parts are the itemized input validation layer and the path sandbox that
//! confines every file operation to a fixed set of directories.

pub mod models;
pub mod server;
pub mod settings;
pub mod tools;
pub mod validate;

pub use server::Server;
pub use settings::Settings;
pub use tools::{Tool, ToolError, ToolOutput, ToolRegistry};
