pub mod handlers;
pub mod registry;

pub use handlers::register_search_tools;
pub use registry::{ToolExecutionResult, ToolHandler, ToolHandlerContext, ToolRegistry};
