//! Sparkure CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! sparkure migrate
//!
//! # Seed the main administrator (no-op if the email is already an admin)
//! sparkure admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//!
//! # Invite an administrator and print the sign-up link
//! sparkure admin invite -e ops@example.com -n "Ops Person" --days 3
//!
//! # Housekeeping
//! sparkure invitations prune
//! sparkure users verify-emails
//! ```
//!
//! # Environment Variables
//!
//! - `SPARKURE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SPARKURE_BASE_URL` - Public URL used in invitation links (default: <http://localhost:3000>)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sparkure")]
#[command(author, version, about = "Sparkure CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage admin invitations
    Invitations {
        #[command(subcommand)]
        action: InvitationAction,
    },
    /// Bulk user maintenance
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an administrator account directly
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin full name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Invite an administrator and print the sign-up link
    Invite {
        /// Email address to invite
        #[arg(short, long)]
        email: String,

        /// Invitee full name
        #[arg(short, long)]
        name: String,

        /// Days until the link expires
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

#[derive(Subcommand)]
enum InvitationAction {
    /// Delete expired, unused invitations
    Prune,
}

#[derive(Subcommand)]
enum UserAction {
    /// Mark every user's email as verified
    VerifyEmails,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sparkure_cli=info,sparkure_server=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
            AdminAction::Invite { email, name, days } => {
                commands::admin::create_invite(&email, &name, days).await?;
            }
        },
        Commands::Invitations {
            action: InvitationAction::Prune,
        } => commands::housekeeping::prune_invitations().await?,
        Commands::Users {
            action: UserAction::VerifyEmails,
        } => commands::housekeeping::verify_emails().await?,
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
    fn test_invite_days_default() {
        let cli = Cli::try_parse_from(["sparkure", "admin", "invite", "-e", "a@b.co", "-n", "A"])
            .unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Commands::Admin {
                action: AdminAction::Invite { days, .. },
            } => assert_eq!(days, 7),
            _ => panic!("expected admin invite"),
        }
    }

    #[test]
    fn test_admin_create_requires_password() {
        assert!(
            Cli::try_parse_from(["sparkure", "admin", "create", "-e", "a@b.co", "-n", "A"])
                .is_err()
        );
    }
}
