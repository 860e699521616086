//! Weft CLI — command-line interface for the Weft orchestration engine.
//!
//! Reuses the same core domain logic (weft-core) and server bootstrap
//! (weft-server) that power the HTTP API.

mod commands;

use clap::{Parser, Subcommand};

/// Weft — multi-step LM workflow orchestration
#[derive(Parser)]
#[command(name = "weft", version, about = "Weft — multi-step LM workflow orchestration")]
struct Cli {
    /// Base directory holding agents/ and workflows/ subtrees
    #[arg(long, env = "WEFT_BASE_PATH")]
    base_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Weft HTTP backend server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },

    /// Run one workflow synchronously and print the result
    Run {
        /// Workflow id as declared in its YAML
        workflow_id: String,
        /// Input payload for the workflow
        #[arg(long)]
        input: String,
    },

    /// List configured agents
    Agents,

    /// List configured workflows
    Workflows,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port } => commands::serve::run(&cli.base_path, host, port).await,
        Commands::Run { workflow_id, input } => {
            commands::run::run(&cli.base_path, &workflow_id, &input).await
        }
        Commands::Agents => commands::list::agents(&cli.base_path),
        Commands::Workflows => commands::list::workflows(&cli.base_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
