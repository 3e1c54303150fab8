mod config;
mod error;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::{Orchestrator, Providers, ToolRegistry, mcp};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

#[derive(Parser)]
#[command(name = "plenario")]
#[command(about = "Ask questions about the Brazilian Congress open data", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./plenario.toml when present)
    #[arg(short, long, global = true, env = "PLENARIO_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Answer a single question and exit
    Ask {
        message: String,
        /// Provider to use (gemini or groq)
        #[arg(short, long, default_value = "gemini")]
        provider: String,
    },
    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "plenario=debug,runtime=debug,legis=debug,tower_http=debug,info"
    } else {
        "plenario=info,runtime=info,legis=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Serve { bind }) => cmd_serve(config, bind).await,
        None => cmd_serve(config, None).await,
        Some(Commands::Ask { message, provider }) => cmd_ask(config, &message, &provider).await,
        Some(Commands::Tools) => cmd_tools(&config).await,
    }
}

/// Built-in tools plus those of the configured MCP servers. A built-in
/// tool wins over an MCP tool of the same name.
async fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let mut specs = legis::catalog(&config.sources)?;

    let servers = config.mcp_servers(|var| std::env::var(var).ok());
    if !servers.is_empty() {
        let discovered = mcp::discover_tools(&servers, config.mcp_connect_timeout()).await;
        for spec in discovered {
            if specs.iter().any(|existing| existing.name == spec.name) {
                warn!(tool = %spec.name, "MCP tool name already registered; skipped");
            } else {
                specs.push(spec);
            }
        }
    }

    Ok(ToolRegistry::new(specs)?.with_timeout(config.tool_timeout()))
}

async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let registry = build_registry(config).await?;
    let credentials = config.provider_configs(|var| std::env::var(var).ok());
    let providers = Providers::from_configs(credentials)?;
    if providers.is_empty() {
        warn!("no provider credentials configured; set GOOGLE_API_KEY or GROQ_API_KEY");
    }

    info!(
        tools = registry.len(),
        providers = ?providers.ids(),
        max_rounds = config.orchestrator.max_rounds,
        "orchestrator ready"
    );

    let mut orchestrator = Orchestrator::new(providers, Arc::new(registry))
        .with_max_rounds(config.orchestrator.max_rounds)
        .with_provider_timeout(config.provider_timeout());
    if let Some(instructions) = &config.orchestrator.instructions {
        orchestrator = orchestrator.with_instructions(instructions.clone());
    }
    Ok(orchestrator)
}

async fn cmd_serve(config: Config, bind: Option<SocketAddr>) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(&config).await?);
    server::serve(orchestrator, bind.unwrap_or(config.server.bind)).await
}

async fn cmd_ask(config: Config, message: &str, provider: &str) -> Result<()> {
    let orchestrator = build_orchestrator(&config).await?;
    let reply = orchestrator.handle_turn(message, Vec::new(), provider).await;
    println!("{reply}");
    Ok(())
}

async fn cmd_tools(config: &Config) -> Result<()> {
    let registry = build_registry(config).await?;
    for spec in registry.specs() {
        let params: Vec<String> = spec
            .params
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    format!("{}?", p.name)
                }
            })
            .collect();
        println!("{}({})", spec.name, params.join(", "));
        println!("    {}", spec.description);
    }
    println!("\n{} tools", registry.len());
    Ok(())
}
