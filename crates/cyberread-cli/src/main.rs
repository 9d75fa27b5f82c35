//! cyberread - read and manage cybersecurity articles from the terminal.
//!
//! Every invocation resumes the persisted session (if it is still within
//! the inactivity window), runs one command, and counts as activity.

mod commands;
mod credentials;
mod display;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cyberread_core::markdown::MarkdownAction;
use cyberread_core::{AuthError, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Context;

#[derive(Parser)]
#[command(name = "cyberread", version, about = "Read and manage cyberread articles from the terminal")]
pub struct Cli {
    #[arg(long, help = "Backend API base URL (overrides config and CYBERREAD_API_URL)")]
    pub api_url: Option<String>,

    #[arg(long, value_name = "DIR", help = "Also write logs to daily files in DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in with email and password
    Login {
        #[arg(long, help = "Account email (defaults to CYBERREAD_EMAIL or the last one used)")]
        email: Option<String>,
        #[arg(long, help = "Remember the password in the OS keychain")]
        remember: bool,
        #[arg(long, help = "Only accept an administrator account")]
        admin: bool,
    },
    /// Create an account and log into it
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// End the session
    Logout {
        #[arg(long, help = "Also forget the remembered password")]
        forget: bool,
    },
    /// Show the logged-in user
    Whoami,
    /// Show session state and time left before inactivity logout
    Status,
    /// List published articles
    Articles {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one article
    Read { id: String },
    /// Publish a new article
    Publish {
        #[command(flatten)]
        fields: DraftArgs,
    },
    /// Edit one of your articles
    Edit {
        id: String,
        #[command(flatten)]
        fields: DraftArgs,
        #[arg(long, value_name = "TEXT", help = "Append a paragraph to the content")]
        append: Option<String>,
        #[arg(long, value_enum, requires = "append", help = "Markdown style for the appended text")]
        style: Option<Style>,
    },
    /// Like an article
    Like { id: String },
    /// Comment on an article
    Comment { id: String, text: String },
    /// Delete one of your comments
    Uncomment { id: String, comment_id: String },
    /// List bookmarked articles
    Bookmarks,
    /// Bookmark an article
    Bookmark { id: String },
    /// Remove a bookmark
    Unbookmark { id: String },
    /// Show a random security tip
    Tip,
    /// Show or update your profile
    Profile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long, value_name = "URL")]
        avatar: Option<String>,
    },
    /// Change your password
    Passwd,
    /// Permanently delete your account
    DeleteAccount {
        #[arg(long, help = "Confirm deletion")]
        yes: bool,
    },
    /// Administrator commands
    #[command(subcommand)]
    Admin(AdminCommand),
}

/// Article fields. Anything left out keeps its current (or default) value.
#[derive(Args, Debug, Default)]
pub struct DraftArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, value_name = "PATH", help = "Markdown content, or - to read stdin")]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, help = "Comma-separated tags")]
    pub tags: Option<String>,
    #[arg(long, value_name = "MINUTES")]
    pub read_time: Option<u32>,
    #[arg(long, value_name = "PATH", help = "Image or video file to upload")]
    pub media: Option<PathBuf>,
    #[arg(long, value_name = "URL")]
    pub image_url: Option<String>,
    #[arg(long, value_name = "URL")]
    pub video_url: Option<String>,
}

/// Editor toolbar styles
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Heading,
    List,
    Ordered,
}

impl From<Style> for MarkdownAction {
    fn from(style: Style) -> Self {
        match style {
            Style::Bold => MarkdownAction::Bold,
            Style::Italic => MarkdownAction::Italic,
            Style::Heading => MarkdownAction::Heading,
            Style::List => MarkdownAction::UnorderedList,
            Style::Ordered => MarkdownAction::OrderedList,
        }
    }
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Dashboard statistics
    Stats,
    /// List users
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Freeze a user account
    Freeze { id: String },
    /// Unfreeze a user account
    Unfreeze { id: String },
    /// Delete a user
    DeleteUser { id: String },
    /// Delete an article
    DeleteArticle { id: String },
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cyberread.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let log_guard = init_tracing(cli.log_dir.as_deref());
    info!("cyberread starting");

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let mut ctx = Context::new(config)?;
    let result = ctx.run(cli.command).await;
    ctx.shutdown();

    if let Err(e) = result {
        match e.downcast_ref::<AuthError>() {
            Some(auth) => eprintln!("Error: {}", auth.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        drop(log_guard);
        std::process::exit(1);
    }

    info!("cyberread done");
    Ok(())
}
