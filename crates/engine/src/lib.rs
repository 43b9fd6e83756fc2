pub mod config;
pub mod extract;
pub mod listing;
pub mod llm;
pub mod mcp;
pub mod tools;
