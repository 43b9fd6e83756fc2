use std::path::PathBuf;

use propsearch_common::config::Credentials;
use propsearch_engine::config;
use propsearch_engine::listing::ListingClient;
use propsearch_engine::mcp::ToolServer;
use propsearch_engine::tools::{register_search_tools, ToolHandlerContext, ToolRegistry};

#[tokio::main]
async fn main() {
    // stdout is reserved for protocol messages.
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("PropSearch tool server starting");

    let config_dir = std::env::var("PROPSEARCH_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let engine_config = match config::load_config(&config_dir) {
        Ok(config) => {
            tracing::info!(dir = %config_dir.display(), "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let listing = match ListingClient::new(&engine_config.system, Credentials::from_env()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build listing client");
            std::process::exit(1);
        }
    };

    let mut registry = ToolRegistry::new(ToolHandlerContext {
        listing,
        output: engine_config.system.tools.output,
    });
    register_search_tools(&mut registry);

    if let Err(e) = registry.load_definitions(&engine_config.tool_schemas) {
        tracing::error!(error = %e, "Failed to load tool definitions");
        std::process::exit(1);
    }

    let server = ToolServer::new(registry, "propsearch");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    if let Err(e) = server.serve(stdin, tokio::io::stdout()).await {
        tracing::error!(error = %e, "Tool server I/O failure");
        std::process::exit(1);
    }
}
