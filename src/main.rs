mod api;
mod client;
mod commands;
mod config;
mod domain;
mod server;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nectar", version, about = "Login gate and device fingerprint dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the nectar daemon (login form, dashboard, REST + GraphQL)
    Serve {
        /// HTTP listen address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,

        /// Log level (overrides config)
        #[arg(long)]
        log_level: Option<String>,

        /// Collector variant: dashboard or login (overrides config)
        #[arg(long)]
        variant: Option<String>,

        /// Path to config file (default: ~/.config/nectar/config.yaml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Collect an environment snapshot for this machine
    Collect {
        /// User-agent string to classify
        #[arg(long)]
        user_agent: Option<String>,

        /// Platform string (default: derived from the host OS)
        #[arg(long)]
        platform: Option<String>,

        /// Screen size, e.g. 1920x1080
        #[arg(long)]
        screen: Option<String>,

        /// IANA timezone (default: $TZ)
        #[arg(long)]
        timezone: Option<String>,

        /// Collector variant: dashboard or login (overrides config)
        #[arg(long)]
        variant: Option<String>,

        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Query a nectar daemon's REST API
    Query {
        /// Daemon base URL (defaults to daemon_url from config)
        #[arg(long, global = true)]
        url: Option<String>,

        /// Output format (table or json)
        #[arg(long, global = true, default_value = "table")]
        format: String,

        /// Path to config file
        #[arg(long, global = true)]
        config: Option<String>,

        #[command(subcommand)]
        command: commands::query::QueryCommands,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            http_addr,
            log_level,
            variant,
            config,
        } => commands::serve::run(http_addr, log_level, variant, config),
        Commands::Collect {
            user_agent,
            platform,
            screen,
            timezone,
            variant,
            format,
            config,
        } => commands::collect::run(commands::collect::CollectArgs {
            user_agent,
            platform,
            screen,
            timezone,
            variant,
            format,
            config,
        }),
        Commands::Query {
            url,
            format,
            config,
            command,
        } => commands::query::run(url.as_deref(), &format, config.as_deref(), &command),
    }
}
