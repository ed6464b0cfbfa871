use std::path::PathBuf;

use clap::{Parser, Subcommand};

use todolist::client::{self, token_file::TokenFile, ClientCommand};
use todolist::{app, config};

#[derive(Parser)]
#[command(name = "todolist", version, about = "Multi-user task list server and client")]
struct Cli {
    /// Server URL used by client commands
    #[arg(long, global = true, env = "TODO_SERVER_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Where the session token is stored
    #[arg(long, global = true, env = "TODO_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve,
    #[command(flatten)]
    Client(ClientCommand),
}

fn init_tracing(default_filter: &str) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            init_tracing("todolist=debug,axum=info,tower_http=info");
            let config = config::AppConfig::from_env()?;
            app::serve(config).await?;
        }
        Commands::Client(command) => {
            init_tracing("warn");
            let tokens = match cli.token_file {
                Some(path) => TokenFile::new(path),
                None => TokenFile::default_location()?,
            };
            client::run(command, &cli.server, &tokens).await?;
        }
    }

    Ok(())
}
