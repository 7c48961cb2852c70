//! Vitrina CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema migrations and create the session table
//! vitrina migrate
//!
//! # Backups
//! vitrina backup create
//! vitrina backup list
//! vitrina backup restore backup_2026-03-01_14-05-09.sql
//! vitrina backup delete backup_2026-03-01_14-05-09.sql
//! vitrina backup cleanup --days 14
//!
//! # Users
//! vitrina users create -e admin@example.com -p 'long password' -r admin
//! vitrina users set-role -e manager@example.com -r manager
//! vitrina users migrate-passwords
//! ```
//!
//! # Environment Variables
//!
//! - `VITRINA_DATABASE_URL` - `PostgreSQL` connection string
//! - `VITRINA_BACKUP_*` - see `BackupConfig` in the storefront crate

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrina")]
#[command(author, version, about = "Vitrina CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage database backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// Manage user accounts
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Dump the database into a new file
    Create,
    /// List recorded backups
    List,
    /// Replay a dump into the database (destructive)
    Restore {
        /// Backup file name, e.g. `backup_2026-03-01_14-05-09.sql`
        filename: String,
    },
    /// Delete a backup file and its record
    Delete {
        /// Backup file name
        filename: String,
    },
    /// Delete dump files older than the retention period
    Cleanup {
        /// Retention in days (defaults to `VITRINA_BACKUP_RETENTION_DAYS`)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// Create a user with a role
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`client`, `manager`, `admin`)
        #[arg(short, long, default_value = "client")]
        role: String,

        /// First name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Last name
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Change the role of an existing user
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`client`, `manager`, `admin`)
        #[arg(short, long)]
        role: String,
    },
    /// Re-hash every legacy plaintext password with Argon2id
    MigratePasswords,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Backup { action } => match action {
            BackupAction::Create => commands::backup::create().await?,
            BackupAction::List => commands::backup::list().await?,
            BackupAction::Restore { filename } => commands::backup::restore(&filename).await?,
            BackupAction::Delete { filename } => commands::backup::delete(&filename).await?,
            BackupAction::Cleanup { days } => commands::backup::cleanup(days).await?,
        },
        Commands::Users { action } => match action {
            UsersAction::Create {
                email,
                password,
                role,
                first_name,
                last_name,
            } => {
                commands::users::create(&email, &password, &role, first_name, last_name).await?;
            }
            UsersAction::SetRole { email, role } => {
                commands::users::set_role(&email, &role).await?;
            }
            UsersAction::MigratePasswords => commands::users::migrate_passwords().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_backup_cleanup_days() {
        let cli = Cli::try_parse_from(["vitrina", "backup", "cleanup", "--days", "7"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Backup {
                action: BackupAction::Cleanup { days: Some(7) }
            })
        ));
    }

    #[test]
    fn test_parse_users_set_role() {
        let cli = Cli::try_parse_from(["vitrina", "users", "set-role", "-e", "a@b.ru", "-r", "admin"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Users {
                action: UsersAction::SetRole { .. }
            })
        ));
    }
}
