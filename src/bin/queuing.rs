//! queuing CLI: the publisher, subscriber and job creator processes.

use clap::{Parser, Subcommand};
use queuing_system::broker::Broker;
use queuing_system::config::Config;
use queuing_system::console::Console;
use queuing_system::engine::{self, JobCreator, JobOutcome, Publisher, Subscriber};
use queuing_system::model::{CHANNEL, JobId, Priority};
use queuing_system::telemetry::{TelemetryConfig, init_telemetry};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Parser)]
#[command(name = "queuing", about = "Redis pub/sub and job queue processes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish the course announcements on the channel
    Publish,
    /// Print channel messages until KILL_SERVER arrives
    Subscribe,
    /// Create a push notification job and follow its lifecycle
    CreateJob {
        /// low, normal, medium, high or critical
        #[arg(long, default_value = "normal")]
        priority: Priority,
        /// Attempts allowed before the job fails for good
        #[arg(long, default_value_t = 1)]
        attempts: u32,
    },
    /// Job operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Subcommand)]
enum JobAction {
    /// Show a saved job
    Show {
        /// Job id as assigned by the queue
        id: JobId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "queuing".to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Publish => cmd_publish(&config).await,
        Command::Subscribe => cmd_subscribe(&config).await,
        Command::CreateJob { priority, attempts } => {
            cmd_create_job(&config, priority, attempts).await
        }
        Command::Job {
            action: JobAction::Show { id },
        } => cmd_job_show(&config, id).await,
    }
}

/// Notify `shutdown` on Ctrl-C.
fn on_ctrl_c(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        shutdown.notify_one();
    });
}

async fn cmd_publish(config: &Config) -> anyhow::Result<()> {
    let mut console = Console::stdio();
    let Some(broker) = engine::connected(Broker::connect(config.redis_url()).await, &mut console)?
    else {
        return Ok(());
    };

    Publisher::new(broker, CHANNEL, engine::publisher::course_schedule())
        .run(&mut console)
        .await?;
    Ok(())
}

async fn cmd_subscribe(config: &Config) -> anyhow::Result<()> {
    let mut console = Console::stdio();
    let Some(conn) = engine::connected(
        Broker::connect_subscriber(config.redis_url()).await,
        &mut console,
    )?
    else {
        return Ok(());
    };

    let subscriber = Subscriber::new(conn, CHANNEL);
    on_ctrl_c(subscriber.shutdown_handle());
    subscriber.run(&mut console).await?;
    Ok(())
}

async fn cmd_create_job(
    config: &Config,
    priority: Priority,
    attempts: u32,
) -> anyhow::Result<()> {
    let mut console = Console::stdio();
    let attempt = match Broker::connect(config.redis_url()).await {
        Ok(broker) => {
            let broker = broker.with_prefix(&config.queue_prefix);
            broker.job_events().await.map(|events| (broker, events))
        }
        Err(e) => Err(e),
    };
    let Some((broker, events)) = engine::connected(attempt, &mut console)? else {
        return Ok(());
    };

    let creator = JobCreator::new(broker, events)
        .priority(priority)
        .attempts(attempts);
    on_ctrl_c(creator.shutdown_handle());
    match creator.run(&mut console).await? {
        JobOutcome::Completed(id) => tracing::info!(%id, "job completed"),
        JobOutcome::Failed(id) => tracing::warn!(%id, "job failed"),
        JobOutcome::Detached(id) => tracing::info!(%id, "stopped watching job"),
    }
    Ok(())
}

async fn cmd_job_show(config: &Config, id: JobId) -> anyhow::Result<()> {
    let mut console = Console::stdio();
    let Some(broker) = engine::connected(Broker::connect(config.redis_url()).await, &mut console)?
    else {
        return Ok(());
    };
    let mut broker = broker.with_prefix(&config.queue_prefix);

    let job = broker.get_job(id).await?;

    println!("ID:         {}", job.id);
    println!("Type:       {}", job.job_type);
    println!("State:      {}", job.state);
    println!("Priority:   {}", job.priority);
    println!("Attempts:   {}/{}", job.attempts, job.max_attempts);
    println!("Data:       {}", serde_json::to_string_pretty(&job.data)?);
    println!("Created:    {}", job.created_at);
    println!("Updated:    {}", job.updated_at);
    Ok(())
}
