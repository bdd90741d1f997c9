//! Tool infrastructure: the registry, handlers, and search tools.

pub mod registry;
pub mod search;

pub use registry::{FnTool, ToolEntry, ToolHandler, ToolRegistry};
pub use search::{register_search_tools, SearchFilters, SearchTool, SearchWebArgs};
