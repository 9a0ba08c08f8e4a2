use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod notes_cmd;
mod reminders_cmd;
mod state;

use notes_cmd::NoteCommand;
use notewa_store::DEFAULT_HISTORY_LIMIT;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("NOTEWA_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "notewa", version = VERSION, about = "Notes with WhatsApp deadline reminders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage ~/.notewa/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Create an account tied to a WhatsApp number
    Register {
        #[arg(long)]
        username: String,

        /// Phone number, e.g. 081234567890 or +6281234567890
        #[arg(long)]
        phone: String,
    },

    /// Switch the active account on this machine
    Login {
        #[arg(long)]
        username: String,
    },

    /// Forget the active account
    Logout,

    /// Show the active account
    Whoami,

    /// Create, edit and list notes
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },

    /// Show recent note activity
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Send reminders for every note due within the sweep window
    Sweep {
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Print messages instead of sending them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Run the reminder check for one of your notes
    Check {
        note_id: String,

        /// Use this deadline instead of the stored one
        #[arg(long)]
        deadline: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Send one WhatsApp message right away
    Send {
        #[arg(long)]
        to: String,

        #[arg(long)]
        text: String,
    },

    /// Print the reminder text for a title and deadline
    Preview {
        #[arg(long)]
        title: String,

        #[arg(long)]
        deadline: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,

    /// Show the effective configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("NOTEWA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Check => config::config_check()?,
        },

        Command::Register { username, phone } => {
            let user = state::open_store()?.register_user(&username, &phone, Utc::now())?;
            login_as(&user)?;
            println!("Registered {} ({}) and logged in.", user.username, user.phone_number);
        }

        Command::Login { username } => {
            let user = state::open_store()?.login(&username)?;
            login_as(&user)?;
            println!("Logged in as {}.", user.username);
        }

        Command::Logout => {
            state::clear_session()?;
            println!("Logged out.");
        }

        Command::Whoami => {
            let session = state::require_session()?;
            match state::open_store()?.user(&session.user_id)? {
                Some(user) => println!("{} ({}) {}", user.username, user.id, user.phone_number),
                None => {
                    state::clear_session()?;
                    anyhow::bail!("Account {} no longer exists. Run: notewa login", session.username);
                }
            }
        }

        Command::Note { command } => notes_cmd::run(command).await?,

        Command::History { limit } => notes_cmd::history(limit)?,

        Command::Sweep { json, dry_run } => reminders_cmd::sweep(json, dry_run).await?,

        Command::Check {
            note_id,
            deadline,
            json,
            dry_run,
        } => reminders_cmd::check(&note_id, deadline.as_deref(), json, dry_run).await?,

        Command::Send { to, text } => reminders_cmd::send(&to, &text).await?,

        Command::Preview { title, deadline } => reminders_cmd::preview(&title, &deadline),
    }

    Ok(())
}

fn login_as(user: &notewa_store::User) -> Result<()> {
    state::write_session(&state::Session {
        user_id: user.id.clone(),
        username: user.username.clone(),
        logged_in_at: Utc::now(),
    })
}
