use anyhow::{Context, Result};
use calcom_mcp::config::{find_config_file, load_config, render_toml, Config, LogLevel};
use calcom_mcp::credential::AuthToken;
use calcom_mcp::mcp::McpServer;
use calcom_mcp::tools::catalog;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cal.com MCP - Expose the Cal.com API to MCP clients
#[derive(Parser, Debug)]
#[command(name = "calcom-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Expose Cal.com schedules, verified resources and webhooks as MCP tools", long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace); overrides --log-level
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server options when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
struct ServeArgs {
    /// Port to listen on for HTTP
    #[arg(long, env = "CAL_COM_MCP_SERVER_PORT")]
    port: Option<u16>,

    /// Host to bind to for HTTP
    #[arg(long)]
    host: Option<String>,

    /// Logging level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Enable JSON responses for streamable HTTP instead of SSE streams
    #[arg(long)]
    json_response: bool,

    /// Serve over stdio instead of HTTP
    #[arg(long)]
    stdio: bool,

    /// Cal.com API key used by the stdio transport
    #[arg(long, env = "CAL_COM_API_KEY", hide_env_values = true)]
    auth_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default)
    Serve(ServeArgs),

    /// List the tools this server exposes
    Tools {
        /// Print the full descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl ServeArgs {
    /// Apply command-line overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.json_response {
            config.server.json_response = true;
        }
        if let Some(token) = &self.auth_token {
            config.api.auth_token = Some(token.clone());
        }
    }
}

fn init_tracing(level: LogLevel, verbose: u8) {
    let directive = match verbose {
        0 => level.directive(),
        1 => "debug",
        _ => "trace",
    };

    // stderr keeps stdout free for the stdio transport
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("calcom_mcp={}", directive)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_tools(json: bool) -> Result<()> {
    let tools = catalog();
    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
    } else {
        for tool in &tools {
            println!("{:<40} {}", tool.name, tool.description);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let serve = match &cli.command {
        Some(Commands::Serve(args)) => args.clone(),
        _ => cli.serve.clone(),
    };

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;
    serve.apply(&mut config);

    init_tracing(config.logging.level, cli.verbose);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Some(Commands::Tools { json }) => print_tools(json),
        Some(Commands::Config) => {
            print!("{}", render_toml(&config)?);
            Ok(())
        }
        Some(Commands::Serve(_)) | None => {
            let server = McpServer::from_config(&config)?;
            if serve.stdio {
                let token = config.api.auth_token.clone().and_then(AuthToken::new);
                server.run_stdio(token).await?;
            } else {
                let addr = config.socket_addr()?;
                server.run_http(addr).await?;
            }
            tracing::info!("Server stopped");
            Ok(())
        }
    }
}
