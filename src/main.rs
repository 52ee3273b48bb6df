use clap::Parser;
use pretrade_risk::cli::{Cli, Commands};
use pretrade_risk::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example"))?
        }
    };

    // Initialize telemetry
    pretrade_risk::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Replay(args) => {
            tracing::info!(events = %args.events.display(), "Starting replay");
            args.execute(&config).await?;
        }
        Commands::Market(args) => args.execute(&config)?,
        Commands::Limits(args) => args.execute(&config)?,
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Limits: HNI threshold={}, warning at {}%",
                config.limits.hni_net_worth_threshold,
                config.limits.warning_ratio * rust_decimal_macros::dec!(100)
            );
            println!(
                "  Individual caps: single={}, aggregate={}, daily loss={}",
                config.limits.individual.single_instrument,
                config.limits.individual.aggregate,
                config.limits.individual.daily_loss
            );
            println!(
                "  HNI caps: single={}, aggregate={}, daily loss={}",
                config.limits.hni.single_instrument,
                config.limits.hni.aggregate,
                config.limits.hni.daily_loss
            );
            for (name, tier) in [
                ("LEVEL_1", &config.breaker.level_1),
                ("LEVEL_2", &config.breaker.level_2),
                ("LEVEL_3", &config.breaker.level_3),
            ] {
                println!(
                    "  Breaker {}: loss >= {}, cool-off {} min",
                    name, tier.loss_ratio, tier.cooloff_minutes
                );
            }
            println!(
                "  Market: UTC offset {} min, {} holidays",
                config.market.utc_offset_minutes,
                config.market.holidays.len()
            );
            println!(
                "  Controller: large order > {}, rapid >= {} orders / {}s",
                config.controller.large_order_threshold,
                config.controller.rapid_order_count,
                config.controller.rapid_window_secs
            );
        }
    }

    Ok(())
}
