use dotenv::dotenv;
use pursuit::episode::Episode;
use pursuit::infra::DefaultObserver;
use pursuit::EngineConfig;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pursuit=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = EngineConfig::from_env();
    config.validate()?;
    tracing::info!(
        seed = config.seed,
        arena_size = config.arena_size,
        definition = config.definition,
        budget = config.planner.budget,
        "Starting pursuit episode"
    );

    let summary = Episode::new(config, DefaultObserver).run()?;
    if !summary.captured {
        tracing::warn!(ticks = summary.ticks, "Adversary escaped");
    }
    Ok(())
}
