use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use anvil::server::Server;
use anvil::settings::Settings;
use anvil::tools::ToolRegistry;

#[derive(Parser, Debug)]
#[command(name = "anvil", version, about = "Sandboxed tool server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve line-delimited JSON requests over stdio (default)
    Serve,
    /// Invoke a single tool and print the response
    Call {
        /// Tool name (calculate, manage_file, search_web)
        tool: String,
        /// Parameters as a JSON object
        params: String,
    },
    /// Print the JSON schemas of all registered tools
    Schemas,
    /// Run component self-checks
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env();
    settings.ensure_directories()?;
    tracing::info!(data_dir = %settings.data_dir.display(), "settings loaded");

    let server = Server::new(ToolRegistry::builtin(&settings), settings);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server.run_stdio().await?,
        Command::Call { tool, params } => {
            // Reuse the wire format so one-shot calls behave exactly like
            // served requests.
            let request = serde_json::json!({
                "id": 0,
                "tool": tool,
                "params": serde_json::from_str::<serde_json::Value>(&params)?,
            });
            let response = server.handle(&request.to_string()).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response["ok"] != serde_json::Value::Bool(true) {
                std::process::exit(1);
            }
        }
        Command::Schemas => {
            let schemas = server.registry().schemas();
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
        Command::Health => {
            let checks = server.registry().health().await;
            let healthy = checks.values().all(|ok| *ok);
            for (name, ok) in &checks {
                println!("{name}: {}", if *ok { "ok" } else { "FAILED" });
            }
            if !healthy {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
