//! Callable tool surface.
//!
//! Each tool validates its input, executes, and returns a structured JSON
//! result. The registry wires tools to the dispatcher.

pub mod builtin;

mod registry;
mod sandbox;
mod tool;

pub use registry::ToolRegistry;
pub use sandbox::PathSandbox;
pub use tool::{parse_params, Tool, ToolError, ToolOutput, ToolSchema};
