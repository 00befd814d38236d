mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use cadence_lib::scheduler::planner::{DEFAULT_DAYS_AHEAD, DEFAULT_SESSION_MINUTES};

#[derive(Parser)]
#[command(name = "cadence-cli", about = "Spaced repetition flashcard scheduler", version)]
struct Cli {
    /// Config file (default: <data dir>/cadence/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Add a card to a collection
    Add {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        collection: Uuid,
        /// Question side
        #[arg(long)]
        front: String,
        /// Answer side
        #[arg(long)]
        back: String,
        #[arg(long)]
        topic: Option<String>,
        /// Difficulty level, 1-5
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Record a review of a card
    Review {
        card: Uuid,
        #[arg(long)]
        owner: Uuid,
        /// Recall quality, 0 (blackout) to 5 (perfect)
        #[arg(long, allow_negative_numbers = true)]
        quality: i32,
    },

    /// List cards due for review
    Due {
        #[arg(long)]
        owner: Uuid,
        /// Maximum cards (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one card with its review preview
    Show {
        card: Uuid,
        #[arg(long)]
        owner: Uuid,
    },

    /// List cards of a collection, newest first
    List {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        collection: Uuid,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Replace the text of a card
    Edit {
        card: Uuid,
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Study statistics
    Stats {
        #[arg(long)]
        owner: Uuid,
        /// Break down by topic
        #[arg(long)]
        topics: bool,
    },

    /// Plan a study session and the days ahead
    Plan {
        #[arg(long)]
        owner: Uuid,
        /// Session length in minutes
        #[arg(long, default_value_t = DEFAULT_SESSION_MINUTES)]
        minutes: f64,
        /// Days of upcoming reviews to show
        #[arg(long, default_value_t = DEFAULT_DAYS_AHEAD)]
        days: u32,
    },

    /// Delete a card
    Delete {
        card: Uuid,
        #[arg(long)]
        owner: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::open(cli.config.as_deref(), cli.db.as_deref()).await?;
    let format = &cli.format;

    let result = match cli.command {
        Command::Add { owner, collection, front, back, topic, difficulty } => {
            commands::add::run(
                &app, owner, collection, front, back, topic, difficulty, format, use_color,
            )
            .await
        }
        Command::Review { card, owner, quality } => {
            commands::review::run(&app, card, owner, quality, format, use_color).await
        }
        Command::Due { owner, limit } => {
            commands::due::run(&app, owner, limit, format, use_color).await
        }
        Command::Show { card, owner } => {
            commands::show::run(&app, card, owner, format, use_color).await
        }
        Command::List { owner, collection, page, limit } => {
            commands::list::run(&app, owner, collection, page, limit, format, use_color).await
        }
        Command::Edit { card, owner, front, back, topic, difficulty } => {
            let edit = commands::edit::ContentEdit { front, back, topic, difficulty };
            commands::edit::run(&app, card, owner, edit, format, use_color).await
        }
        Command::Stats { owner, topics } => {
            commands::stats::run(&app, owner, topics, format, use_color).await
        }
        Command::Plan { owner, minutes, days } => {
            commands::plan::run(&app, owner, minutes, days, format, use_color).await
        }
        Command::Delete { card, owner } => {
            commands::delete::run(&app, card, owner, format).await
        }
    };

    app.close().await;
    result
}
