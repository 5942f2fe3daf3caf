use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::Input;
use serde_json::json;

use drawbridge_core::config::Config;
use drawbridge_gateway::planner::planner_from_config;
use drawbridge_gateway::GatewayState;
use drawbridge_plugin::runtime::PluginRuntime;
use drawbridge_scene::document::MemoryDocument;

#[derive(Parser)]
#[command(
    name = "drawbridge",
    about = "Text-to-design bridge: prompts in, canvas commands out",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on (default: 4000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the plugin runtime against an in-memory canvas
    Plugin {
        /// Poll URL (default: the local gateway's /commands/next)
        #[arg(long)]
        url: Option<String>,

        /// Milliseconds between poll cycles
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Send a design prompt to a running gateway (omit for interactive mode)
    Design {
        /// Prompt to send
        prompt: Option<String>,

        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:4000")]
        server: String,
    },

    /// Fetch and print the next queued command
    Next {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:4000")]
        server: String,
    },

    /// Show gateway status
    Status {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:4000")]
        server: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
}

fn init_logging(config: &Config, verbose: bool) {
    let logging = config.logging.clone().unwrap_or_default();

    let level = if verbose {
        "debug".to_string()
    } else {
        logging.level.clone().unwrap_or_else(|| "info".to_string())
    };

    let mut filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    for directive in &logging.filters {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring bad log filter {directive:?}: {e}"),
        }
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (logging.format.as_str(), logging.output.as_str()) {
        ("json", "stdout") => builder.json().init(),
        ("json", _) => builder.json().with_writer(std::io::stderr).init(),
        (_, "stdout") => builder.init(),
        _ => builder.with_writer(std::io::stderr).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_dir);
    let config = Config::load(&config_path)?;

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Serve { port } => {
            let (warnings, errors) = config.validate();
            for warning in &warnings {
                tracing::warn!("Config: {warning}");
            }
            if !errors.is_empty() {
                for error in &errors {
                    tracing::error!("Config: {error}");
                }
                anyhow::bail!("Invalid configuration");
            }

            let port = port.unwrap_or_else(|| config.gateway_port());
            let bind = config.gateway_bind();
            let planner = planner_from_config(&config)?;
            tracing::info!(planner = planner.id(), "Starting Drawbridge gateway on port {port}");

            let state = Arc::new(GatewayState::new(planner));
            drawbridge_gateway::start_gateway(state, &bind, port).await?;
        }

        Commands::Plugin { url, interval_ms } => {
            let url = url.unwrap_or_else(|| config.poll_url());
            let interval_ms = interval_ms.unwrap_or_else(|| config.poll_interval_ms());
            let doc = Arc::new(MemoryDocument::new());

            tracing::info!("Polling {url} every {interval_ms}ms, ctrl-c to stop");
            let handle = PluginRuntime::new(url, interval_ms, doc.clone()).spawn();

            tokio::signal::ctrl_c().await?;
            handle.shutdown().await;

            // Dump what the session built before the canvas disappears
            println!("{}", serde_json::to_string_pretty(&doc.snapshot())?);
        }

        Commands::Design { prompt, server } => {
            let client = reqwest::Client::new();
            match prompt {
                Some(prompt) => send_prompt(&client, &server, &prompt).await?,
                None => loop {
                    let line: String = Input::new()
                        .with_prompt("design")
                        .allow_empty(true)
                        .interact_text()?;
                    let line = line.trim();
                    if line.is_empty() || line == "exit" {
                        break;
                    }
                    if let Err(e) = send_prompt(&client, &server, line).await {
                        eprintln!("Error: {e}");
                    }
                },
            }
        }

        Commands::Next { server } => {
            let body: serde_json::Value =
                reqwest::get(format!("{}/commands/next", server.trim_end_matches('/')))
                    .await?
                    .json()
                    .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Status { server } => {
            println!("Drawbridge v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("Gateway: {server}");
            match reqwest::get(format!("{}/health", server.trim_end_matches('/'))).await {
                Ok(resp) if resp.status().is_success() => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("Status: running");
                    println!("Planner: {}", body["planner"].as_str().unwrap_or("?"));
                    println!("Queued: {}", body["queued"]);
                }
                _ => println!("Status: not running"),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => {
                    eprintln!("Key not found: {key}");
                    std::process::exit(1);
                }
            },
            ConfigAction::Set { key, value } => {
                let mut config = config;
                let parsed = serde_json::from_str(&value)
                    .unwrap_or(serde_json::Value::String(value));
                config.set_path(&key, parsed)?;
                config.save(&config_path)?;
                println!("Updated {key}");
            }
        },
    }

    Ok(())
}

async fn send_prompt(client: &reqwest::Client, server: &str, prompt: &str) -> anyhow::Result<()> {
    let resp = client
        .post(format!("{}/prompts", server.trim_end_matches('/')))
        .json(&json!({"prompt": prompt}))
        .send()
        .await?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if !status.is_success() {
        anyhow::bail!("{}", body["msg"].as_str().unwrap_or("request failed"));
    }
    println!("Queued {} command(s)", body["queued_count"]);
    Ok(())
}
