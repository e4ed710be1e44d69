use anyhow::{Context, Result};
use dotenv::dotenv;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulse_monitor::search::{popular_tokens, RecentSearches};
use pulse_monitor::{derive_view, Catalog, Config, FilterCriteria, LiveTokens, SortKey, SubscriptionRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Config::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!("Configuration loaded successfully");

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .await
            .with_context(|| format!("Failed to load catalog from {:?}", path))?,
        None => Catalog::builtin().context("Built-in catalog is invalid")?,
    };
    info!("Catalog ready with {} tokens", catalog.len());

    let recent = RecentSearches::with_path(config.recent_searches_path.clone());
    recent.load().await;
    let recent_list = recent.list().await;
    if !recent_list.is_empty() {
        info!("Recent searches: {}", recent_list.join(", "));
    }
    for token in popular_tokens(catalog.tokens()) {
        info!("🔥 Popular: {} ({}) {}", token.name, token.symbol, token.change_24h);
    }

    let registry = SubscriptionRegistry::new(config.generator_config());
    registry.start().context("Failed to start live update service")?;

    let live = LiveTokens::new(&catalog);
    live.attach(&registry);

    let criteria = FilterCriteria::default();
    let sort = SortKey::default();
    let mut refresh = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs));

    info!("Starting Pulse monitor, press Ctrl-C to stop...");
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
            _ = refresh.tick() => {
                let view = derive_view(&live.tokens(), &criteria, sort);
                for (section, tokens) in view.by_section.iter() {
                    match tokens.first() {
                        Some(top) => info!(
                            "{} ({}): top {} {} {} vol {}",
                            section,
                            view.section_counts.get(section),
                            top.name,
                            top.price_usd,
                            top.change_24h,
                            top.volume_24h
                        ),
                        None => info!("{} ({}): no matches", section, view.section_counts.get(section)),
                    }
                }

                let activity = registry.activity();
                info!(
                    "📊 {} feeds live, {} updates, last {}, avg interval {:?}",
                    activity.active_tokens,
                    activity.total_updates,
                    activity.time_since_update(),
                    activity.avg_update_interval
                );
            }
        }
    }

    live.detach();
    registry.dispose();
    info!("Pulse monitor stopped");
    Ok(())
}
