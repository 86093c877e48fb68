use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::PgPool;
use sqlqueue::{Dialect, Queue, QueueConfig, Request, RequestHandler, Response, ResponseDeliverer};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line front-end for a sqlqueue-backed work queue.
#[derive(Parser)]
#[command(name = "sqlqueue-cli", version, about)]
struct Cli {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Fully-qualified table name.
    #[arg(long, default_value = "test.test_task")]
    table: String,

    /// Delete rows after successful delivery instead of marking them notified.
    #[arg(long)]
    delete_after_response_sent: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue one or more requests, given as `id=data` pairs.
    Add {
        #[arg(required = true)]
        requests: Vec<String>,
        /// Reject the whole batch if any ID already exists.
        #[arg(long, default_value_t = true)]
        fail_if_duplicate: bool,
    },
    /// Claim up to `limit` NEW rows, echo each request as its response, and save.
    Handle {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Claim up to `limit` HANDLED rows and print each delivered response to stdout.
    Respond {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Print the request IDs currently in the given state.
    Inspect { state: InspectState },
    /// Print the current state of a single request.
    State { request_id: i64 },
    /// Delete every row in the table.
    DeleteAll,
    /// Apply a schema file to provision the queue table.
    Migrate {
        #[arg(long)]
        schema: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InspectState {
    New,
    Handled,
    Notified,
}

/// Handler used by the `handle` subcommand: `response<id> = "response" + id`,
/// matching the test convention used throughout this crate.
struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn compute_response(
        &self,
        request: &Request,
        _txn: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> anyhow::Result<Response> {
        Ok(Response::new(0, format!("response{}", request.id).into_bytes()))
    }
}

/// Deliverer used by the `respond` subcommand: prints the response to stdout.
struct StdoutDeliverer;

#[async_trait]
impl ResponseDeliverer for StdoutDeliverer {
    async fn deliver_response(&self, request_id: i64, response: &Response) -> anyhow::Result<()> {
        println!(
            "{request_id}: code={} data={}",
            response.code,
            String::from_utf8_lossy(&response.data)
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Command::Migrate { schema } = &cli.command {
        return run_migrate(&cli.database_url, schema).await;
    }

    let pool = PgPool::connect(&cli.database_url)
        .await
        .context("connecting to database")?;

    let build_queue = |limit: u32| {
        let config = QueueConfig::new(cli.table.clone(), Dialect::PostgreSql)
            .with_delete_after_response_sent(cli.delete_after_response_sent)
            .with_fetch_for_handling_limit(limit)
            .with_fetch_for_notification_limit(limit);
        Queue::new(pool.clone(), config, Arc::new(EchoHandler), Arc::new(StdoutDeliverer))
    };

    match cli.command {
        Command::Add {
            requests,
            fail_if_duplicate,
        } => run_add(&build_queue(10), &requests, fail_if_duplicate).await,
        Command::Handle { limit } => build_queue(limit).handle().await.context("handling batch"),
        Command::Respond { limit } => build_queue(limit).respond().await.context("responding to batch"),
        Command::Inspect { state } => run_inspect(&build_queue(10), state).await,
        Command::State { request_id } => run_state(&build_queue(10), request_id).await,
        Command::DeleteAll => {
            let deleted = build_queue(10).delete_all().await.context("deleting all rows")?;
            println!("deleted {deleted} rows");
            Ok(())
        }
        Command::Migrate { .. } => unreachable!("handled above"),
    }
}

async fn run_add(queue: &Queue, requests: &[String], fail_if_duplicate: bool) -> anyhow::Result<()> {
    let parsed = requests
        .iter()
        .map(|entry| {
            let (id, data) = entry
                .split_once('=')
                .context("request must be given as id=data")?;
            let id: i64 = id.parse().context("request id must be an integer")?;
            Ok(Request::new(id, data.as_bytes()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    queue.add(&parsed, fail_if_duplicate).await?;
    info!(count = parsed.len(), "enqueued requests");
    Ok(())
}

async fn run_inspect(queue: &Queue, state: InspectState) -> anyhow::Result<()> {
    let ids = match state {
        InspectState::New => queue.not_handled_request_ids().await?,
        InspectState::Handled => queue.not_notified_request_ids().await?,
        InspectState::Notified => queue.notified_request_ids().await?,
    };
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

async fn run_state(queue: &Queue, request_id: i64) -> anyhow::Result<()> {
    match queue.row_state(request_id).await? {
        Some(state) => println!("{}", state.as_str()),
        None => println!("no such request"),
    }
    Ok(())
}

async fn run_migrate(database_url: &str, schema: &PathBuf) -> anyhow::Result<()> {
    let pool = PgPool::connect(database_url)
        .await
        .context("connecting to database")?;
    let statements = std::fs::read_to_string(schema)
        .with_context(|| format!("reading schema file {}", schema.display()))?;
    sqlx::raw_sql(&statements)
        .execute(&pool)
        .await
        .context("applying schema")?;
    info!(path = %schema.display(), "applied schema");
    Ok(())
}
