//! Operator CLI: migrations, event setup, pool generation and inventory stats.

use anyhow::Context;
use lotto_app::bootstrap::{self, ProductionService};
use lotto_app::{Command, Config, USAGE};
use lotto_core::environment::{Clock, IdentityProtector, SystemClock};
use lotto_core::store::EventRepository;
use lotto_core::types::{EventId, Tier};
use lotto_runtime::PoolGeneration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lotto=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = Config::from_env().context("Failed to load configuration")?;
    let _metrics = bootstrap::start_metrics(&config).context("Failed to start metrics exporter")?;
    let store = bootstrap::connect(&config.postgres)
        .await
        .context("Failed to connect to database")?;

    match command {
        Command::Migrate => {
            store.migrate().await.context("Migration failed")?;
            info!("Migrations applied");
        }
        Command::CreateEvent { name, winner_phone } => {
            let identity = bootstrap::identity_protector(&config)?;
            let event = lotto_app::standard_event(
                name,
                identity.fingerprint(&winner_phone),
                SystemClock.now(),
            );
            store
                .insert_event(&event)
                .await
                .context("Failed to create event")?;
            info!(event_id = %event.id, "Event created");
            println!("{}", event.id);
        }
        Command::GeneratePool(event_id) => {
            let service = bootstrap::service(&config, store)?;
            generate_pool(&service, event_id).await?;
        }
        Command::Stats(event_id) => {
            let service = bootstrap::service(&config, store)?;
            print_stats(&service, event_id).await?;
        }
    }

    Ok(())
}

async fn generate_pool(service: &ProductionService, event_id: EventId) -> anyhow::Result<()> {
    match service.generate_pool(event_id).await? {
        PoolGeneration::Generated { slots } => {
            println!("Generated {slots} slots for event {event_id}");
        }
        PoolGeneration::AlreadyGenerated { existing } => {
            println!("Event {event_id} already has {existing} slots; nothing written");
        }
    }
    print_stats(service, event_id).await
}

async fn print_stats(service: &ProductionService, event_id: EventId) -> anyhow::Result<()> {
    let summary = service.tier_summary(event_id).await?;

    println!("{:<10} {:>8} {:>8} {:>8}", "tier", "total", "used", "left");
    for tier in Tier::ALL {
        let count = summary.get(tier);
        println!(
            "{:<10} {:>8} {:>8} {:>8}",
            tier.label(),
            count.total,
            count.used,
            count.remaining()
        );
    }
    println!("{:<10} {:>8}", "all", summary.total());
    Ok(())
}
