//! mcp-probe - CLI validator for MCP server compliance.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcp_probe::error::ProbeError;
use mcp_probe::report::format_report;
use mcp_probe::runner::{compute_exit_code, Runner, RunnerOptions};
use mcp_probe::transport::TransportConfig;
use mcp_probe::McpClient;

#[derive(Parser, Debug)]
#[command(name = "mcp-probe")]
#[command(about = "CLI validator for Model Context Protocol (MCP) server compliance")]
#[command(version)]
struct Args {
    /// Command line to launch the target server over stdio.
    #[arg(value_name = "COMMAND", required_unless_present = "url")]
    command: Option<String>,

    /// Target server URL for the HTTP transport.
    #[arg(long, conflicts_with = "command")]
    url: Option<String>,

    /// Transport to use (inferred from the target when omitted).
    #[arg(long, value_parser = ["stdio", "http", "sse"])]
    transport: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Comma-separated list of suites to run (lifecycle always included).
    #[arg(long, value_delimiter = ',', value_name = "SUITE")]
    suite: Option<Vec<String>>,

    /// Output format.
    #[arg(long, default_value = "console", value_parser = ["console", "json"])]
    format: String,

    /// Write the report to this path instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<std::path::PathBuf>,

    /// Show details for every check, not only failures.
    #[arg(short, long)]
    verbose: bool,

    /// Promote warnings to exit-code failures.
    #[arg(long)]
    strict: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Extra HTTP header as "Name: Value"; repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Run the OAuth suite against an HTTP target.
    #[arg(long)]
    oauth: bool,

    /// OAuth client id for the authorization flow.
    #[arg(long, default_value = "mcp-probe")]
    client_id: String,

    /// Local port for the OAuth redirect callback.
    #[arg(long, default_value_t = 8765)]
    redirect_port: u16,
}

impl Args {
    /// Resolves the target into a transport recipe, rejecting
    /// contradictory selections.
    fn transport_config(&self) -> Result<TransportConfig, ProbeError> {
        if self.transport.as_deref() == Some("sse") {
            return Err(ProbeError::Config(
                "The 'sse' transport has been superseded; use --transport http \
                 (SSE response streaming is negotiated automatically)"
                    .to_string(),
            ));
        }
        match (&self.command, &self.url) {
            (Some(command), None) => {
                if self.transport.as_deref() == Some("http") {
                    return Err(ProbeError::Config(
                        "--transport http requires --url, not a command".to_string(),
                    ));
                }
                Ok(TransportConfig::Stdio {
                    command: command.clone(),
                })
            }
            (None, Some(url)) => {
                if self.transport.as_deref() == Some("stdio") {
                    return Err(ProbeError::Config(
                        "--transport stdio requires a command, not --url".to_string(),
                    ));
                }
                Ok(TransportConfig::Http {
                    url: url.clone(),
                    headers: self.parsed_headers()?,
                    timeout: Duration::from_secs(self.timeout),
                })
            }
            // clap enforces exactly one of COMMAND / --url.
            _ => Err(ProbeError::Config(
                "either COMMAND or --url must be given".to_string(),
            )),
        }
    }

    fn parsed_headers(&self) -> Result<Vec<(String, String)>, ProbeError> {
        self.headers
            .iter()
            .map(|header| {
                header
                    .split_once(':')
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                    .filter(|(name, _)| !name.is_empty())
                    .ok_or_else(|| {
                        ProbeError::Config(format!(
                            "invalid header '{header}', expected \"Name: Value\""
                        ))
                    })
            })
            .collect()
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn probe(args: Args) -> Result<i32, ProbeError> {
    let config = args.transport_config()?;
    let timeout = Duration::from_secs(args.timeout);

    let options = RunnerOptions {
        suites: args.suite.clone(),
        timeout,
        server_url: args.url.clone(),
        oauth_enabled: args.oauth,
        oauth_client_id: args.client_id.clone(),
        redirect_port: args.redirect_port,
    };

    let client = McpClient::new(config.build(), timeout);
    let mut runner = Runner::new(client, config, options)?;

    let report = runner.run().await;
    runner.shutdown().await;
    let report = report?;

    let output = format_report(&report, &args.format, args.verbose, !args.no_color);
    match &args.output {
        Some(path) => {
            std::fs::write(path, output).map_err(|e| {
                ProbeError::Config(format!("cannot write report to {}: {e}", path.display()))
            })?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{output}"),
    }

    Ok(compute_exit_code(&report, args.strict))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let probe_task = tokio::spawn(probe(args));

    let result = tokio::select! {
        result = probe_task => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the probe task tears the transport down; the child
            // is killed if the graceful signal does not take.
            eprintln!("Interrupted");
            return ExitCode::from(130);
        }
    };

    match result {
        Ok(Ok(code)) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Ok(Err(e @ ProbeError::Config(_))) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
        Err(join_error) => {
            eprintln!("error: {join_error}");
            ExitCode::from(1)
        }
    }
}
