//! Server command implementation

use anyhow::Result;

use datasight_core::AppConfig;

pub async fn cmd_serve(
    config: AppConfig,
    host: &str,
    port: u16,
    mcp_port: Option<u16>,
) -> Result<()> {
    println!("Starting Datasight server...");
    println!("   Data dir: {}", config.storage.data_dir.display());
    println!("   Output dir: {}", config.storage.output_dir.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(mcp) = mcp_port {
        println!("   MCP server: http://{}:{}/mcp", host, mcp);
    }
    if config.ai.api_key.is_none() {
        println!("   Insight endpoint: no API key, rule-based insights only");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    // Start MCP server if port specified
    if let Some(mcp) = mcp_port {
        let mcp_config = config.clone();
        let mcp_host = host.to_string();
        tokio::spawn(async move {
            if let Err(e) =
                datasight_server::mcp::start_mcp_server(mcp_config, &mcp_host, mcp).await
            {
                eprintln!("MCP server error: {}", e);
            }
        });
    }

    datasight_server::serve(config, host, port).await?;

    Ok(())
}
