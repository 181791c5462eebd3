use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dissertation_assistant::api::{self, AppState};
use dissertation_assistant::config::{find_config_file, load_config, Config, LogFormat};
use dissertation_assistant::mcp::McpServer;
use dissertation_assistant::models::{GenerationRequest, ModelCredential, Module};
use dissertation_assistant::providers::{GenerationSettings, ProviderRegistry};
use dissertation_assistant::ui::{self, OutputFormat, Status};
use dissertation_assistant::utils::HttpClient;
use dissertation_assistant::{Dispatcher, FailurePolicy};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Dissertation Assistant - model-backed writing aid for dissertations
#[derive(Parser, Debug)]
#[command(name = "dissertation-assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Titles, outlines, drafts, polishing and references for dissertations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Failure policy (overrides the configuration file)
    #[arg(long, value_enum, global = true)]
    policy: Option<FailurePolicy>,

    /// Provider request timeout in seconds (overrides the configuration file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API (default) or the MCP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(long, short)]
        port: Option<u16>,

        /// Run the MCP server over stdio instead of the HTTP API
        #[arg(long, conflicts_with = "mcp_http")]
        mcp: bool,

        /// Run the MCP server over streamable HTTP instead of the HTTP API
        #[arg(long)]
        mcp_http: bool,
    },

    /// Run one module and print its result
    #[command(alias = "gen")]
    Generate {
        /// Module: topic, outline, draft, polish, search, citations
        module: Module,

        /// JSON file holding the request
        #[arg(long, short)]
        request: Option<PathBuf>,

        /// Text input for the module (replaces the request's input)
        #[arg(long, short)]
        input: Option<String>,
    },

    /// List registered providers
    Providers {
        /// Show protocol, base URL and capabilities
        #[arg(long, short)]
        detailed: bool,
    },

    /// List the models available to an API key
    Models {
        /// Provider id
        #[arg(long, default_value = "gpt")]
        provider: String,

        /// API key
        #[arg(long)]
        api_key: String,

        /// API base URL (provider default when omitted)
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => config
            .logging
            .level
            .clone()
            .unwrap_or_else(|| "info".to_string()),
        (false, 1) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("dissertation_assistant={}", level)),
    );

    // Logs go to stderr; stdout carries results and the MCP stdio transport
    let json = config.logging.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn build_dispatcher(cli: &Cli, config: &Config) -> Result<Arc<Dispatcher>> {
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.http.timeout());
    let client = HttpClient::with_timeouts(timeout, config.http.connect_timeout())
        .context("Failed to create HTTP client")?;

    let settings: GenerationSettings = config.generation.settings();
    let registry = ProviderRegistry::new(settings, Arc::new(client));
    let policy = cli.policy.unwrap_or(config.generation.policy);
    tracing::debug!(%policy, ?timeout, "Dispatcher configured");

    Ok(Arc::new(Dispatcher::new(Arc::new(registry), policy)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config file {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })?;

    init_logging(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let dispatcher = build_dispatcher(&cli, &config)?;

    match cli.command {
        None => serve_api(dispatcher, &config, None, None).await,

        Some(Commands::Serve {
            host,
            port,
            mcp,
            mcp_http,
        }) => {
            if mcp {
                McpServer::new(dispatcher)?.run().await?;
                Ok(())
            } else if mcp_http {
                let addr = bind_address(&config, host, port)?;
                let server = McpServer::new(dispatcher)?;
                let (bound, handle) = server.run_http(&addr.to_string()).await?;
                if !cli.quiet {
                    ui::print_status(
                        Status::Info,
                        &format!("MCP server listening on http://{}", bound),
                    );
                }
                handle.await.context("MCP server task failed")?;
                Ok(())
            } else {
                serve_api(dispatcher, &config, host, port).await
            }
        }

        Some(Commands::Generate {
            module,
            request,
            input,
        }) => {
            let mut request = match request {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<GenerationRequest>(&text)
                        .with_context(|| format!("Invalid request in {}", path.display()))?
                }
                None => GenerationRequest::default(),
            };
            if let Some(input) = input {
                request.input = input;
            }

            match dispatcher.generate(module, &request).await {
                Ok(result) => {
                    ui::print_canonical_result(&result, cli.output)?;
                    Ok(())
                }
                Err(err) => {
                    ui::print_generation_error(&err, cli.output)?;
                    std::process::exit(1);
                }
            }
        }

        Some(Commands::Providers { detailed }) => {
            let providers = dispatcher.providers().all();
            ui::print_providers(&providers, detailed, cli.output)?;
            Ok(())
        }

        Some(Commands::Models {
            provider,
            api_key,
            base_url,
        }) => {
            let mut credential = ModelCredential::new(provider, api_key);
            if let Some(base_url) = base_url {
                credential = credential.base_url(base_url);
            }
            let listing = dispatcher.list_models(&credential).await;
            ui::print_models(&listing, cli.output)?;
            if listing.error.is_some() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn bind_address(config: &Config, host: Option<String>, port: Option<u16>) -> Result<SocketAddr> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let ip: IpAddr = host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .with_context(|| format!("Invalid listen host {}", host))?;
    Ok(SocketAddr::new(ip, port))
}

async fn serve_api(
    dispatcher: Arc<Dispatcher>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let addr = bind_address(config, host, port)?;
    tracing::info!(policy = %dispatcher.policy(), "Starting HTTP API");
    api::serve(AppState::new(dispatcher), addr).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["dissertation-assistant"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert_eq!(cli.policy, None);
        assert_eq!(cli.timeout, None);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["dissertation-assistant", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["dissertation-assistant", "providers", "--verbose"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_policy_and_output() {
        let cli = Cli::parse_from([
            "dissertation-assistant",
            "--policy",
            "strict",
            "-o",
            "json",
            "--timeout",
            "15",
        ]);
        assert_eq!(cli.policy, Some(FailurePolicy::Strict));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.timeout, Some(15));
    }

    #[test]
    fn test_cli_generate_command() {
        let cli = Cli::parse_from([
            "dissertation-assistant",
            "generate",
            "search-refs",
            "--input",
            "adaptive learning",
        ]);
        match cli.command {
            Some(Commands::Generate { module, input, request }) => {
                assert_eq!(module, Module::Search);
                assert_eq!(input.as_deref(), Some("adaptive learning"));
                assert!(request.is_none());
            }
            other => panic!("Expected Generate command, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["dissertation-assistant", "generate", "summary"]).is_err());
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["dissertation-assistant", "serve", "--port", "9000", "--mcp-http"]);
        match cli.command {
            Some(Commands::Serve { port, mcp, mcp_http, host }) => {
                assert_eq!(port, Some(9000));
                assert!(!mcp);
                assert!(mcp_http);
                assert!(host.is_none());
            }
            other => panic!("Expected Serve command, got {:?}", other),
        }

        assert!(
            Cli::try_parse_from(["dissertation-assistant", "serve", "--mcp", "--mcp-http"]).is_err()
        );
    }

    #[test]
    fn test_cli_models_command() {
        let cli = Cli::parse_from([
            "dissertation-assistant",
            "models",
            "--provider",
            "gemini",
            "--api-key",
            "g-key",
        ]);
        match cli.command {
            Some(Commands::Models { provider, api_key, base_url }) => {
                assert_eq!(provider, "gemini");
                assert_eq!(api_key, "g-key");
                assert!(base_url.is_none());
            }
            other => panic!("Expected Models command, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_address() {
        let config = Config::default();
        let addr = bind_address(&config, None, Some(9100)).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9100");
        assert!(bind_address(&config, Some("not a host".into()), None).is_err());

        let addr = bind_address(&config, Some("::1".into()), Some(9100)).unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.to_string(), "[::1]:9100");

        let addr = bind_address(&config, Some("[::]".into()), Some(8787)).unwrap();
        assert_eq!(addr.to_string(), "[::]:8787");
    }
}
