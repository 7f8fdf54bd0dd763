use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ditchfork_server::user::{SqliteUserStore, UserManager, UserRole};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser)]
#[command(about = "Manages Ditchfork users, passwords and role claims")]
struct CliArgs {
    /// Path to the user database, created if missing.
    #[clap(value_parser = parse_path)]
    user_db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates a user with the given handle.
    AddUser {
        user_handle: String,
        /// Also sets the password of the new user.
        #[clap(long)]
        password: Option<String>,
    },

    /// Sets or replaces the password of a user.
    SetPassword {
        user_handle: String,
        password: String,
    },

    /// Grants a role claim (admin, moderator, member).
    AddRole { user_handle: String, role: UserRole },

    /// Revokes a role claim.
    RemoveRole { user_handle: String, role: UserRole },

    /// Shows the roles and permissions of a user.
    Show { user_handle: String },

    /// Lists all user handles.
    List,

    /// Deletes auth tokens unused for the given number of days.
    PruneTokens { unused_for_days: u64 },
}

fn user_id_of(manager: &UserManager, user_handle: &str) -> Result<usize> {
    manager
        .get_user_id(user_handle)?
        .with_context(|| format!("User with handle {} not found.", user_handle))
}

fn execute(manager: &UserManager, command: Command) -> Result<()> {
    match command {
        Command::AddUser {
            user_handle,
            password,
        } => {
            let user_id = manager.add_user(&user_handle)?;
            if let Some(password) = password {
                manager.set_password(&user_handle, &password)?;
            }
            println!("Created user {} with id {}", user_handle, user_id);
        }
        Command::SetPassword {
            user_handle,
            password,
        } => {
            manager.set_password(&user_handle, &password)?;
            println!("Password of {} updated", user_handle);
        }
        Command::AddRole { user_handle, role } => {
            let user_id = user_id_of(manager, &user_handle)?;
            manager.add_user_role(user_id, role)?;
            println!("Granted {} to {}", role, user_handle);
        }
        Command::RemoveRole { user_handle, role } => {
            let user_id = user_id_of(manager, &user_handle)?;
            manager.remove_user_role(user_id, role)?;
            println!("Revoked {} from {}", role, user_handle);
        }
        Command::Show { user_handle } => {
            let user_id = user_id_of(manager, &user_handle)?;
            let roles = manager.get_user_roles(user_id)?;
            let permissions = manager.get_user_permissions(user_id)?;
            println!("{} (id {})", user_handle, user_id);
            println!("  roles: {:?}", roles);
            println!("  permissions: {:?}", permissions);
        }
        Command::List => {
            let handles = manager.get_all_user_handles()?;
            if handles.is_empty() {
                println!("No users.");
            }
            for handle in handles {
                println!("{}", handle);
            }
        }
        Command::PruneTokens { unused_for_days } => {
            let count = manager.prune_unused_auth_tokens(unused_for_days)?;
            println!("Pruned {} auth tokens", count);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_store = SqliteUserStore::new(&cli_args.user_db)
        .with_context(|| format!("Failed to open user database {:?}", cli_args.user_db))?;
    let manager = UserManager::new(Box::new(user_store));
    execute(&manager, cli_args.command)
}
