// SPDX-License-Identifier: MIT

//! `es` — operator CLI for inspecting and driving the local edge runtime
//! emulator daemon: start/follow it with `dev`/`tail`, check `status`, and
//! inspect each binding's state with a subcommand group per resource.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;
mod table;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "es", version, about = "Inspect and control the local edge runtime emulator", styles = color::styles())]
struct Cli {
    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon for local development
    Dev {
        /// Run in the foreground instead of detaching
        #[arg(long, short)]
        foreground: bool,
    },
    /// Show and follow the daemon's log output
    Tail {
        /// Number of trailing lines to show before following
        #[arg(long, short = 'n', default_value_t = 20)]
        lines: usize,
        /// Keep following new log lines
        #[arg(long, short)]
        follow: bool,
    },
    /// Show a cross-binding status overview
    Status,
    /// Inspect key-value namespaces
    Kv {
        #[command(subcommand)]
        command: commands::kv::KvCommand,
    },
    /// Inspect object-store buckets
    R2 {
        #[command(subcommand)]
        command: commands::objects::ObjectsCommand,
    },
    /// Inspect Durable Object actors
    Actors {
        #[command(subcommand)]
        command: commands::actors::ActorsCommand,
    },
    /// Inspect queue messages
    Queues {
        #[command(subcommand)]
        command: commands::queues::QueuesCommand,
    },
    /// Inspect workflow instances
    Workflows {
        #[command(subcommand)]
        command: commands::workflows::WorkflowsCommand,
    },
    /// Inspect the HTTP response cache
    Cache {
        #[command(subcommand)]
        command: commands::cache::CacheCommand,
    },
    /// Inspect recorded tracing spans
    Spans {
        #[command(subcommand)]
        command: commands::spans::SpansCommand,
    },
    /// Inspect and manually trigger cron schedules
    Crons {
        #[command(subcommand)]
        command: commands::crons::CronsCommand,
    },
    /// Inspect recorded AI proxy calls
    AiProxy {
        #[command(subcommand)]
        command: commands::logs::AiProxyCommand,
    },
    /// Inspect recorded outbound email
    Email {
        #[command(subcommand)]
        command: commands::logs::EmailCommand,
    },
    /// Inspect recorded analytics data points
    Analytics {
        #[command(subcommand)]
        command: commands::logs::AnalyticsCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    let result = match cli.command {
        Commands::Dev { foreground } => commands::dev::handle(foreground).await,
        Commands::Tail { lines, follow } => commands::tail::handle(lines, follow).await,
        Commands::Status => commands::status::handle(format).await,
        Commands::Kv { command } => commands::kv::handle(command, format).await,
        Commands::R2 { command } => commands::objects::handle(command, format).await,
        Commands::Actors { command } => commands::actors::handle(command, format).await,
        Commands::Queues { command } => commands::queues::handle(command, format).await,
        Commands::Workflows { command } => commands::workflows::handle(command, format).await,
        Commands::Cache { command } => commands::cache::handle(command, format).await,
        Commands::Spans { command } => commands::spans::handle(command, format).await,
        Commands::Crons { command } => commands::crons::handle(command, format).await,
        Commands::AiProxy { command } => commands::logs::handle_ai_proxy(command, format).await,
        Commands::Email { command } => commands::logs::handle_email(command, format).await,
        Commands::Analytics { command } => commands::logs::handle_analytics(command, format).await,
    };

    if let Err(err) = result {
        if let Some(exit_err) = err.downcast_ref::<ExitError>() {
            eprintln!("error: {exit_err}");
            std::process::exit(exit_err.code);
        }
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
