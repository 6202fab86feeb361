//! Noun Project MCP server - Main Entry Point
//!
//! Speaks MCP on stdin/stdout; all logging goes to stderr.

use clap::{Parser, Subcommand};
use noun_project_mcp::client::{ClientConfig, NounProjectClient};
use noun_project_mcp::config::ServerConfig;
use noun_project_mcp::observability::init_default_logging;
use noun_project_mcp::server::McpServer;
use noun_project_mcp::tools::{noun_project_descriptions, ToolSystem};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// MCP server exposing The Noun Project icon API
#[derive(Parser)]
#[command(name = "noun-project-mcp")]
#[command(about = "MCP server for searching and downloading Noun Project icons")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "NOUN_PROJECT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (default)
    Serve,
    /// Print the tool descriptions as JSON
    Tools,
    /// Validate configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Tools => print_tools(),
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(ServerConfig::load_from_file(path)?);
    }

    for path_str in ["noun-project.toml", "config/noun-project.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(ServerConfig::load_from_file(&path)?);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(ServerConfig::default())
}

async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Starting Noun Project MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let credentials = config.credentials()?;
    let client = NounProjectClient::new(ClientConfig::from(&config), credentials)?;
    let tools = Arc::new(ToolSystem::with_noun_project(Arc::new(client)));
    info!(tools = ?tools.list_tools(), "tools registered");

    let server = McpServer::new(tools, config.server.name.clone());
    let shutdown = CancellationToken::new();

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
        signal_token.cancel();
    });

    server
        .serve(tokio::io::stdin(), tokio::io::stdout(), shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn print_tools() -> Result<(), Box<dyn std::error::Error>> {
    let definitions: Vec<_> = noun_project_descriptions()
        .iter()
        .map(|d| d.to_definition())
        .collect();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

fn handle_config_command(
    config: &ServerConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
