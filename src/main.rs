use clap::Parser;
use tracing_subscriber::EnvFilter;

use mailpilot_cli::MailPilotServer;
use mailpilot_session::AppConfig;

#[derive(Parser)]
#[command(
    name = "mailpilot",
    version,
    about = "MCP server that drives a webmail UI through heuristic element resolution"
)]
struct Cli {
    /// Run the browser with a visible window, overriding HEADLESS
    #[arg(long)]
    headed: bool,

    /// Tracing filter when RUST_LOG is unset, e.g. "info,mailpilot_flows=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the MCP transport; all logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::from_env();
    if cli.headed {
        config.headless = false;
    }

    let server = MailPilotServer::new(config);
    server.bootstrap().await;
    // A transport failure here is the one fatal error path.
    server.run().await
}
