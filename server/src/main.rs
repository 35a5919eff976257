use anyhow::{Context, Result};
use axum::http::HeaderValue;
use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use todo_server::config::{Cli, Command, GlobalArgs, ServeArgs};
use todo_server::{seed, Database, TodoStore};

#[tokio::main]
async fn main() -> Result<()> {
    let (global, command) = Cli::parse().into_parts()?;
    init_tracing(global.log_json);

    match command {
        Command::Serve(args) => serve(&global, args).await,
        Command::Migrate { reset } => migrate(&global, reset),
        Command::Seed => seed_sample(&global),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,todo_server=debug,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn open(global: &GlobalArgs) -> Result<Database> {
    Database::open(&global.database, &global.connection_config())
        .with_context(|| format!("failed to open database {}", global.database.display()))
}

async fn serve(global: &GlobalArgs, args: ServeArgs) -> Result<()> {
    let db = open(global)?;
    db.ensure_schema_current()?;
    let origin = HeaderValue::from_str(&args.cors_origin)
        .with_context(|| format!("invalid CORS origin {:?}", args.cors_origin))?;

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(
        addr = %listener.local_addr()?,
        database = %global.database.display(),
        cors_origin = %args.cors_origin,
        "listening"
    );
    todo_server::run(listener, todo_server::app(db, origin)).await?;
    Ok(())
}

fn migrate(global: &GlobalArgs, reset: bool) -> Result<()> {
    let db = open(global)?;
    let applied = if reset { db.reset()? } else { db.migrate()? };
    info!(applied, database = %global.database.display(), "database schema is current");
    Ok(())
}

fn seed_sample(global: &GlobalArgs) -> Result<()> {
    let db = open(global)?;
    db.ensure_schema_current()?;
    seed::seed(&TodoStore::new(db), Utc::now().date_naive())?;
    Ok(())
}
