use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use alignzo::commands;
use alignzo::commands::init::{ALIGNZO_DIR, DB_FILE};
use alignzo::config;
use alignzo::db::Database;

#[derive(Parser)]
#[command(name = "alignzo")]
#[command(about = "Track work against tickets: timers, work logs, CSV imports")]
#[command(version)]
struct Cli {
    /// Act as this user (defaults to the configured user)
    #[arg(long, global = true, env = "ALIGNZO_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize alignzo in the current directory
    Init {
        /// Email of the acting user
        email: String,
    },

    /// Timer management
    Timer {
        #[command(subcommand)]
        action: TimerCommands,
    },

    /// Work-log management
    Log {
        #[command(subcommand)]
        action: LogCommands,
    },

    /// CSV ticket imports
    Import {
        #[command(subcommand)]
        action: ImportCommands,
    },

    /// Organization-to-project mappings
    Mapping {
        #[command(subcommand)]
        action: MappingCommands,
    },

    /// Upload session management
    Uploads {
        #[command(subcommand)]
        action: UploadCommands,
    },

    /// Imported tickets
    Tickets {
        #[command(subcommand)]
        action: TicketCommands,
    },
}

#[derive(Subcommand)]
enum TimerCommands {
    /// Start a new timer
    Start {
        /// Project name
        #[arg(long)]
        project: String,
        /// Ticket identifier
        #[arg(long)]
        ticket: String,
        /// What is being worked on
        #[arg(long)]
        detail: String,
        /// Category as key=value (repeatable)
        #[arg(long, value_parser = parse_category)]
        category: Vec<(String, String)>,
    },
    /// Pause a running timer
    Pause {
        /// Timer ID
        id: i64,
    },
    /// Resume a paused timer
    Resume {
        /// Timer ID
        id: i64,
    },
    /// Stop a timer and write its work log
    Stop {
        /// Timer ID
        id: i64,
    },
    /// Show open timers
    Status,
    /// Watch open timers until Ctrl-C
    Watch {
        /// Database poll interval in seconds
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Add a work log manually
    Add {
        /// Project name
        #[arg(long)]
        project: String,
        /// Ticket identifier
        #[arg(long)]
        ticket: String,
        /// What was worked on
        #[arg(long)]
        detail: String,
        /// Start time ('YYYY-MM-DD HH:MM' or RFC 3339)
        #[arg(long)]
        start: String,
        /// End time ('YYYY-MM-DD HH:MM' or RFC 3339)
        #[arg(long)]
        end: String,
        /// Category as key=value (repeatable)
        #[arg(long, value_parser = parse_category)]
        category: Vec<(String, String)>,
    },
    /// List work logs
    List,
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import a ticket CSV export
    Run {
        /// Path to the CSV file
        file: PathBuf,
        /// Source system the export came from
        #[arg(long)]
        source: String,
    },
    /// Print or write a sample CSV with the required headers
    Sample {
        /// Write to this path instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
enum MappingCommands {
    /// Add an organization-to-project mapping
    Add {
        /// Source system
        #[arg(long)]
        source: String,
        /// Assigned support organization value as it appears in exports
        #[arg(long)]
        organization: String,
        /// Internal project name
        #[arg(long)]
        project: String,
    },
    /// List mappings
    List {
        /// Only mappings for this source
        #[arg(long)]
        source: Option<String>,
    },
    /// Delete a mapping and everything under it
    Delete {
        /// Mapping ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Assignee-to-user bindings
    User {
        #[command(subcommand)]
        action: UserMappingCommands,
    },
}

#[derive(Subcommand)]
enum UserMappingCommands {
    /// Bind an export assignee value to a user email
    Add {
        /// Mapping ID (per-mapping binding)
        #[arg(long, conflicts_with = "source")]
        mapping: Option<i64>,
        /// Source system (global binding)
        #[arg(long)]
        source: Option<String>,
        /// Assignee value as it appears in exports
        #[arg(long)]
        assignee: String,
        /// User email to resolve to
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum UploadCommands {
    /// List upload sessions
    List,
    /// Show one upload session
    Show {
        /// Session ID
        id: i64,
    },
    /// Delete an upload session and its tickets
    Delete {
        /// Session ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum TicketCommands {
    /// List imported tickets
    List {
        /// Maximum rows to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

fn parse_category(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("'{}' is not key=value", raw)),
    }
}

fn find_alignzo_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let candidate = current.join(ALIGNZO_DIR);
        if candidate.exists() && candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not an alignzo workspace (or any parent). Run 'alignzo init' first.");
        }
    }
}

fn get_db() -> Result<Database> {
    let alignzo_dir = find_alignzo_dir()?;
    let db_path = alignzo_dir.join(DB_FILE);
    Database::open(&db_path).context("Failed to open database")
}

fn resolve_user(flag: Option<String>, alignzo_dir: &Path) -> Result<String> {
    if let Some(user) = flag {
        return Ok(user);
    }
    if let Some(config) = config::load(alignzo_dir)? {
        return Ok(config.user_email);
    }
    bail!("No user configured. Pass --user, set ALIGNZO_USER, or re-run 'alignzo init'.");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { email } = &cli.command {
        let cwd = env::current_dir()?;
        return commands::init::run(&cwd, email);
    }

    // `import sample` needs no workspace either
    if let Commands::Import {
        action: ImportCommands::Sample { output },
    } = &cli.command
    {
        return commands::import::sample(output.as_deref());
    }

    let alignzo_dir = find_alignzo_dir()?;
    let user = resolve_user(cli.user, &alignzo_dir)?;
    let db = get_db()?;

    match cli.command {
        Commands::Init { .. } | Commands::Import { action: ImportCommands::Sample { .. } } => {
            unreachable!("handled above")
        }

        Commands::Timer { action } => match action {
            TimerCommands::Start {
                project,
                ticket,
                detail,
                category,
            } => commands::timer::start(&db, &user, &project, &ticket, &detail, &category),
            TimerCommands::Pause { id } => commands::timer::pause(&db, &user, id),
            TimerCommands::Resume { id } => commands::timer::resume(&db, &user, id),
            TimerCommands::Stop { id } => commands::timer::stop(&db, &user, id),
            TimerCommands::Status => commands::timer::status(&db, &user),
            TimerCommands::Watch { interval } => commands::timer::watch(&db, &user, interval.max(1)),
        },

        Commands::Log { action } => match action {
            LogCommands::Add {
                project,
                ticket,
                detail,
                start,
                end,
                category,
            } => commands::log::add(&db, &user, &project, &ticket, &detail, &start, &end, &category),
            LogCommands::List => commands::log::list(&db, &user),
        },

        Commands::Import { action } => match action {
            ImportCommands::Run { file, source } => {
                commands::import::run(&db, &user, &source, &file)
            }
            ImportCommands::Sample { .. } => unreachable!("handled above"),
        },

        Commands::Mapping { action } => match action {
            MappingCommands::Add {
                source,
                organization,
                project,
            } => commands::mapping::add(&db, &source, &organization, &project),
            MappingCommands::List { source } => commands::mapping::list(&db, source.as_deref()),
            MappingCommands::Delete { id, force } => commands::mapping::delete(&db, id, force),
            MappingCommands::User {
                action:
                    UserMappingCommands::Add {
                        mapping,
                        source,
                        assignee,
                        email,
                    },
            } => commands::mapping::add_user(&db, mapping, source.as_deref(), &assignee, &email),
        },

        Commands::Uploads { action } => match action {
            UploadCommands::List => commands::uploads::list(&db, &user),
            UploadCommands::Show { id } => commands::uploads::show(&db, id),
            UploadCommands::Delete { id, force } => commands::uploads::delete(&db, id, force),
        },

        Commands::Tickets { action } => match action {
            TicketCommands::List { limit } => commands::tickets::list(&db, limit),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!(
            parse_category("Work Type=Incident").unwrap(),
            ("Work Type".to_string(), "Incident".to_string())
        );
        assert_eq!(
            parse_category(" k = v ").unwrap(),
            ("k".to_string(), "v".to_string())
        );
        assert!(parse_category("no-equals").is_err());
        assert!(parse_category("=value").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
