mod search_properties;

use super::registry::ToolRegistry;

pub const SEARCH_PROPERTIES: &str = "search_properties";

/// Register all listing search tool handlers with the registry.
pub fn register_search_tools(registry: &mut ToolRegistry) {
    registry.register(SEARCH_PROPERTIES, search_properties::handler());
}
