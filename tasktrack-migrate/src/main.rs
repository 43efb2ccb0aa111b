//! tasktrack migration CLI
//!
//! Inspects and moves the schema along the revision chain outside of service
//! startup. Mutating commands take the same advisory lock the service uses.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use std::time::Duration;
use tasktrack::migration::{
    MigrationLockGuard, Migrator, PgAdvisoryLock, Target, DEFAULT_LOCK_KEY,
};
use tasktrack::revisions::task_revisions;
use tasktrack::{connect, MayPostgresExecutor};

#[derive(Parser)]
#[command(name = "tasktrack-migrate")]
#[command(about = "Schema migration tool for tasktrack")]
#[command(version)]
struct Cli {
    /// Database connection URL
    #[arg(long)]
    database_url: Option<String>,

    /// Advisory lock key shared with the service
    #[arg(long, default_value_t = DEFAULT_LOCK_KEY)]
    lock_key: i64,

    /// Seconds to wait for the lock; 0 waits forever
    #[arg(long, default_value_t = 60)]
    lock_timeout: u64,

    /// Verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the applied revision
    Current,
    /// List every revision, oldest first
    History,
    /// Show the head revision
    Heads,
    /// Apply revisions up to TARGET
    Upgrade {
        #[arg(default_value = "head")]
        target: Target,
    },
    /// Revert revisions down to TARGET (`base` reverts everything)
    Downgrade { target: Target },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        process::exit(1);
    }
}

fn database_url(cli: &Cli) -> anyhow::Result<String> {
    cli.database_url
        .clone()
        .or_else(|| std::env::var("TASKTRACK__DATABASE__URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .context(
            "database URL not provided; use --database-url or set TASKTRACK__DATABASE__URL or DATABASE_URL",
        )
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let migrator = Migrator::new(task_revisions()?);

    match &cli.command {
        Commands::History => return history(&migrator),
        Commands::Heads => {
            println!("{} (head)", migrator.chain().head().unwrap_or("<base>"));
            return Ok(());
        }
        _ => {}
    }

    let url = database_url(cli)?;
    let executor = MayPostgresExecutor::new(connect(&url).context("failed to connect")?);
    let lock = PgAdvisoryLock::new(&executor);
    let timeout = Duration::from_secs(cli.lock_timeout);

    match &cli.command {
        Commands::Upgrade { target } => {
            let _guard = MigrationLockGuard::acquire(&lock, cli.lock_key, timeout)?;
            let applied = migrator.upgrade_to(&executor, target)?;
            println!("{} {applied} revision(s)", "applied".green());
        }
        Commands::Downgrade { target } => {
            let _guard = MigrationLockGuard::acquire(&lock, cli.lock_key, timeout)?;
            let reverted = migrator.downgrade_to(&executor, target)?;
            println!("{} {reverted} revision(s)", "reverted".yellow());
        }
        Commands::Current | Commands::History | Commands::Heads => {}
    }
    current(&migrator, &executor)
}

fn current(migrator: &Migrator, executor: &MayPostgresExecutor) -> anyhow::Result<()> {
    let status = migrator.status(executor)?;
    match &status.current {
        Some(id) if status.is_up_to_date() => println!("{id} {}", "(head)".green()),
        Some(id) => println!("{id}"),
        None => println!("{}", "<base>".dimmed()),
    }
    if !status.is_up_to_date() {
        println!(
            "{} pending: {}",
            status.pending_count().to_string().yellow(),
            status.pending.join(", ")
        );
    }
    Ok(())
}

fn history(migrator: &Migrator) -> anyhow::Result<()> {
    let head = migrator.chain().head();
    for revision in migrator.chain().revisions().iter().rev() {
        let marker = if Some(revision.id()) == head { " (head)" } else { "" };
        println!(
            "{} -> {}{}, {}",
            revision.down_revision().unwrap_or("<base>"),
            revision.id().bold(),
            marker,
            revision.description()
        );
    }
    Ok(())
}
