//! Command-line and environment configuration for the `todo-server` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::db::ConnectionConfig;

/// Todo list REST API.
#[derive(Debug, Parser)]
#[command(name = "todo-server", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Path to the `SQLite` database file.
    #[arg(long, env = "TODO_DATABASE", default_value = "todos.db", global = true)]
    pub database: PathBuf,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "TODO_POOL_SIZE", default_value_t = 8, global = true)]
    pub pool_size: u32,

    /// Emit logs as JSON lines.
    #[arg(long, env = "TODO_LOG_JSON", global = true)]
    pub log_json: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default).
    Serve(ServeArgs),
    /// Create or upgrade the database schema.
    Migrate {
        /// Drop every table first. Deletes all todos.
        #[arg(long)]
        reset: bool,
    },
    /// Insert sample todos.
    Seed,
}

#[derive(Clone, Debug, Parser)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "TODO_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Single origin allowed to make cross-origin calls to `/api/*`.
    #[arg(long, env = "TODO_CORS_ORIGIN", default_value = crate::DEFAULT_CORS_ORIGIN)]
    pub cors_origin: String,
}

impl Cli {
    /// Split into global options and the subcommand to run. A bare
    /// invocation serves with defaults, still honoring `TODO_BIND` and
    /// `TODO_CORS_ORIGIN`.
    pub fn into_parts(self) -> Result<(GlobalArgs, Command), clap::Error> {
        let command = match self.command {
            Some(command) => command,
            None => Command::Serve(ServeArgs::try_parse_from(["todo-server"])?),
        };
        Ok((self.global, command))
    }
}

impl GlobalArgs {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            pool_size: self.pool_size,
            ..ConnectionConfig::default()
        }
    }
}
