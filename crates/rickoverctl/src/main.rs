//! Admin CLI operating directly against the Store, for local development and
//! operational poking without going through the HTTP producer surface.

use clap::{Parser, Subcommand};
use rickover::db;
use rickover::id::JobId;
use rickover::store::Store;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rickoverctl")]
struct Cli {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a job type.
    RegisterType {
        name: String,
        #[arg(long, default_value = "at_least_once")]
        delivery_strategy: String,
        #[arg(long, default_value_t = 3)]
        attempts: i16,
        #[arg(long, default_value_t = 1)]
        concurrency: i16,
    },
    /// Enqueue a job of an existing type.
    Enqueue {
        name: String,
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// Fetch a job by id (tries queued, then archived).
    Get { id: String },
    /// Replay an archived job, producing a fresh queued job.
    Replay {
        id: String,
        #[arg(long)]
        override_name: Option<String>,
    },
    /// Truncate all tables. For local development only.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let pool = db::make_pool(&cli.database_url, 5).await?;
    let store = Store::new(pool.clone());

    match cli.command {
        Command::RegisterType {
            name,
            delivery_strategy,
            attempts,
            concurrency,
        } => {
            let jt = store
                .job_types
                .register_type(&name, &delivery_strategy, attempts, concurrency)
                .await?;
            println!("registered type {} ({})", jt.name, jt.delivery_strategy);
        }
        Command::Enqueue { name, data } => {
            let id = Uuid::new_v4();
            let job = store
                .queued_jobs
                .enqueue(id, &name, chrono::Utc::now(), None, &data)
                .await?;
            println!("enqueued {}", JobId::from(job.id).to_prefixed_string());
        }
        Command::Get { id } => {
            let job_id = JobId::parse(&id)?;
            if let Ok(job) = store.queued_jobs.get(job_id.uuid()).await {
                println!("queued: {job:?}");
            } else {
                let job = store.archived_jobs.get_archived(job_id.uuid()).await?;
                println!("archived: {job:?}");
            }
        }
        Command::Replay { id, override_name } => {
            let job_id = JobId::parse(&id)?;
            let replayed = store
                .replay(job_id.uuid(), override_name.as_deref(), None)
                .await?;
            println!(
                "replayed {} -> {}",
                id,
                JobId::from(replayed.id).to_prefixed_string()
            );
        }
        Command::Reset => {
            sqlx::query("TRUNCATE TABLE archived_jobs, queued_jobs, jobs RESTART IDENTITY CASCADE")
                .execute(&pool)
                .await?;
            println!("reset OK");
        }
    }

    Ok(())
}
