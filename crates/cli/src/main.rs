//! Library AI CLI - manage your book library from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Create an account and sign in
//! library-ai register -n "Ada" -e ada@example.com --login
//!
//! # List books currently being read
//! library-ai books list --status reading
//!
//! # Add a book
//! library-ai books add -t Dune --price 12.50 --pages 412
//!
//! # Ask the AI a question
//! library-ai ai ask "which is the most popular book?"
//!
//! # Admin: promote a user
//! library-ai admin set-role 4 admin
//! ```
//!
//! Passwords are read from `--password` or `LIBRARY_AI_PASSWORD`.
//!
//! # Environment Variables
//!
//! See `library_ai_client::config`. Logging honours `RUST_LOG`;
//! `LIBRARY_AI_LOG_JSON=1` switches to JSON log lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use library_ai_client::{ClientConfig, LibraryClient};
use library_ai_core::{BookFilter, BookId, LoginForm, ReadingStatus, RegisterForm, Role, UserId};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod render;

use commands::books::BookFields;
use error::CliError;

#[derive(Parser)]
#[command(name = "library-ai")]
#[command(author, version, about = "Library AI command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "LIBRARY_AI_PASSWORD", hide_env_values = true)]
        password: String,

        /// Log in after registering
        #[arg(long)]
        login: bool,
    },
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "LIBRARY_AI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Manage your books
    Books {
        #[command(subcommand)]
        action: BooksAction,
    },
    /// Manage users and all books (admin only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Ask questions about the library
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only books of this genre
    #[arg(short, long)]
    genre: Option<String>,

    /// Only books with this reading status (planned, reading, completed)
    #[arg(short, long)]
    status: Option<ReadingStatus>,
}

impl FilterArgs {
    fn into_filter(self) -> BookFilter {
        BookFilter::new(self.genre.as_deref(), self.status)
    }
}

#[derive(Args)]
struct BookArgs {
    #[arg(short, long)]
    author: Option<String>,

    #[arg(short, long)]
    genre: Option<String>,

    #[arg(long)]
    price: Option<String>,

    #[arg(long)]
    pages: Option<String>,

    /// planned, reading or completed
    #[arg(short, long)]
    status: Option<String>,
}

impl BookArgs {
    fn into_fields(self, title: Option<String>) -> BookFields {
        BookFields {
            title,
            author: self.author,
            genre: self.genre,
            price: self.price,
            pages: self.pages,
            status: self.status,
        }
    }
}

#[derive(Subcommand)]
enum BooksAction {
    /// List your books
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Add a book
    Add {
        #[arg(short, long)]
        title: String,

        #[command(flatten)]
        book: BookArgs,
    },
    /// Change a book; unspecified fields keep their current value
    Update {
        id: BookId,

        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        book: BookArgs,
    },
    /// Delete a book
    Delete { id: BookId },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List all users
    Users,
    /// Create a user
    CreateUser {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "LIBRARY_AI_PASSWORD", hide_env_values = true)]
        password: String,

        /// user or admin
        #[arg(short, long, default_value = "user")]
        role: Role,
    },
    /// Change a user's role
    SetRole { id: UserId, role: Role },
    /// Delete a user and all their books
    DeleteUser { id: UserId },
    /// List every book in the library
    Books {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Delete any book
    DeleteBook { id: BookId },
}

#[derive(Subcommand)]
enum AiAction {
    /// Ask a question in plain language
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Recommend books based on your favorite genre
    Recommend,
    /// Statistics about your library
    Insights,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Quiet by default so command output stays readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());

    let json = std::env::var("LIBRARY_AI_LOG_JSON")
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let (text_layer, json_layer) = if json {
        (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let client = LibraryClient::from_config(config)?;
    client.restore().await;

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
            login,
        } => {
            let form = RegisterForm {
                name,
                email,
                password,
            };
            commands::auth::register(&client, form, login).await?;
        }
        Commands::Login { email, password } => {
            commands::auth::login(&client, LoginForm { email, password }).await?;
        }
        Commands::Logout => commands::auth::logout(&client).await,
        Commands::Whoami => commands::auth::whoami(&client),
        Commands::Books { action } => match action {
            BooksAction::List { filter } => {
                commands::books::list(&client, filter.into_filter()).await?;
            }
            BooksAction::Add { title, book } => {
                commands::books::add(&client, book.into_fields(Some(title))).await?;
            }
            BooksAction::Update { id, title, book } => {
                commands::books::update(&client, id, book.into_fields(title)).await?;
            }
            BooksAction::Delete { id } => commands::books::delete(&client, id).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Users => commands::admin::users(&client).await?,
            AdminAction::CreateUser {
                name,
                email,
                password,
                role,
            } => {
                commands::admin::create_user(&client, &name, &email, &password, role).await?;
            }
            AdminAction::SetRole { id, role } => {
                commands::admin::set_role(&client, id, role).await?;
            }
            AdminAction::DeleteUser { id } => commands::admin::delete_user(&client, id).await?,
            AdminAction::Books { filter } => {
                commands::admin::books(&client, filter.into_filter()).await?;
            }
            AdminAction::DeleteBook { id } => commands::admin::delete_book(&client, id).await?,
        },
        Commands::Ai { action } => match action {
            AiAction::Ask { question } => {
                commands::ai::ask(&client, &question.join(" ")).await?;
            }
            AiAction::Recommend => commands::ai::recommend(&client).await?,
            AiAction::Insights => commands::ai::insights(&client).await?,
        },
    }
    Ok(())
}
