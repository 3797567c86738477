//! Built-in tools served by default.

mod calculator;
mod file;
mod search;

pub use calculator::{Calculator, CalculatorTool};
pub use file::{FileManager, FileTool};
pub use search::{MockSearchApi, SearchTool};
