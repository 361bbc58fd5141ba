//! Market feed entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_feed::api::{create_router, AppState};
use market_feed::catalog::{
    mock_comments, mock_price_history, AmplifiedCatalog, CatalogSource, JsonCatalog, MockCatalog,
};
use market_feed::config::Config;
use market_feed::detail::{legend, CommentView, MarketDetail};
use market_feed::feed::{
    FeedBuilder, FeedSettings, FeedSnapshot, RenderItem, ScrollLayout, ScrollViewport, Variant,
};
use market_feed::metrics;
use market_feed::utils::{shutdown_signal, truncate};

/// Prediction-market feed composition engine.
#[derive(Parser, Debug)]
#[command(name = "market-feed")]
#[command(about = "Infinite-scroll prediction market feed over an amplified catalog")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true, env = "VERBOSE")]
    verbose: bool,

    /// JSON catalog file replacing the built-in mock markets.
    #[arg(long, global = true, env = "CATALOG_PATH")]
    catalog: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the feed over HTTP while a simulated user scrolls (default).
    Run {
        /// HTTP server port.
        #[arg(short, long)]
        port: Option<u16>,

        /// Pause between simulated scrolls to the bottom.
        #[arg(long, default_value = "1500")]
        scroll_interval_ms: u64,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Load pages headlessly and print the rendered feed.
    Scroll {
        /// Number of pages to load.
        #[arg(short = 'n', long, default_value = "1")]
        pages: usize,
    },

    /// Print the detail page of one market, e.g. `0-2`.
    Show {
        /// Route key `<replica>-<id>`.
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("market_feed=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(args.catalog).await,
        Some(Command::Scroll { pages }) => cmd_scroll(args.catalog, pages).await,
        Some(Command::Show { key }) => cmd_show(args.catalog, &key).await,
        Some(Command::Run {
            port,
            scroll_interval_ms,
        }) => cmd_run(args.catalog, port, Duration::from_millis(scroll_interval_ms)).await,
        None => cmd_run(args.catalog, None, Duration::from_millis(1500)).await,
    }
}

/// Load and validate configuration, applying the `--catalog` override.
fn load_config(catalog: Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if catalog.is_some() {
        config.catalog_path = catalog;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Read the configured catalog and amplify it.
fn load_catalog(config: &Config) -> anyhow::Result<Arc<AmplifiedCatalog>> {
    let settings = FeedSettings::from(config);
    let catalog = match &config.catalog_path {
        Some(path) => settings.amplify(&JsonCatalog::new(path))?,
        None => settings.amplify(&MockCatalog)?,
    };
    info!(
        base = catalog.base_len(),
        factor = catalog.factor(),
        total = catalog.len(),
        "Catalog ready"
    );
    Ok(Arc::new(catalog))
}

/// Check configuration validity.
async fn cmd_check_config(catalog: Option<String>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("MARKET FEED - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let mut config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };
    if catalog.is_some() {
        config.catalog_path = catalog;
    }

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Read the catalog
    print!("Reading catalog... ");
    let base = match &config.catalog_path {
        Some(path) => JsonCatalog::new(path).catalog(),
        None => MockCatalog.catalog(),
    };
    let base_len = match base {
        Ok(records) => {
            println!("OK");
            records.len()
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Catalog load failed"));
        }
    };

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!(
        "  Catalog: {} ({} records)",
        config.catalog_path.as_deref().unwrap_or("built-in mock"),
        base_len
    );
    println!(
        "  Amplification: x{} ({} entries)",
        config.amplification_factor,
        config.amplified_len(base_len)
    );
    println!("  Page Size: {}", config.page_size);
    println!("  Load Latency: {}ms", config.load_latency_ms);
    println!("  Visibility Threshold: {}", config.visibility_threshold);
    println!(
        "  Grid: {} columns, {}px rows, {}px viewport",
        config.grid_columns, config.row_height_px, config.viewport_height_px
    );
    println!("  HTTP Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Mount a headless feed, load `pages` pages and print the result.
async fn cmd_scroll(catalog: Option<String>, pages: usize) -> anyhow::Result<()> {
    let config = load_config(catalog)?;
    let catalog = load_catalog(&config)?;

    let feed = FeedBuilder::new(catalog)
        .settings(FeedSettings::from(&config))
        .mount();

    let mut snapshot = feed.wait_for(|s| (!s.loading && s.page > 0) || !s.has_more).await?;
    while snapshot.page < pages && snapshot.has_more {
        let target = snapshot.page + 1;
        feed.load_more()?;
        snapshot = feed
            .wait_for(|s| !s.loading && (s.page >= target || !s.has_more))
            .await?;
    }
    feed.teardown().await;

    print_feed(&snapshot);
    Ok(())
}

fn print_feed(snapshot: &FeedSnapshot) {
    println!("======================================================================");
    println!(
        "MARKET FEED - {} PAGES, {} CARDS ({} EXCLUDED)",
        snapshot.page,
        snapshot.items.len(),
        snapshot.displayed - snapshot.items.len()
    );
    println!("======================================================================");
    for item in &snapshot.items {
        println!("{}", card_line(item));
    }
    println!("----------------------------------------------------------------------");
    println!(
        "Has more: {}",
        if snapshot.has_more { "yes" } else { "no, catalog exhausted" }
    );
}

fn card_line(item: &RenderItem) -> String {
    let market = &item.market;
    let summary = match (item.variant, &item.gauge) {
        (Variant::Binary, Some(gauge)) => format!("{}% chance ({})", gauge.value, gauge.color),
        _ => market
            .outcomes
            .iter()
            .take(2)
            .map(|o| format!("{} {}%", truncate(&o.name, 16), o.probability))
            .collect::<Vec<_>>()
            .join(" | "),
    };
    format!(
        "{:>6} {} {:<50} {:<6} {:>8}  {}",
        item.key.to_string(),
        market.image,
        truncate(&market.title, 50),
        item.variant.to_string(),
        market.volume,
        summary
    )
}

/// Print the detail page of one market.
async fn cmd_show(catalog: Option<String>, key: &str) -> anyhow::Result<()> {
    let config = load_config(catalog)?;
    let catalog = load_catalog(&config)?;
    let detail = MarketDetail::lookup_str(&catalog, key)?;
    let market = &detail.market;

    println!("======================================================================");
    println!("{} {}", market.image, market.title);
    println!("======================================================================");
    println!("  Key: {}", market.key);
    println!("  Volume: {}", market.volume);
    if let Some(deadline) = &market.deadline {
        println!("  Deadline: {}", deadline);
    }
    match (detail.variant, &detail.gauge) {
        (Some(variant), Some(gauge)) => println!(
            "  Variant: {} ({}% chance, {})",
            variant,
            gauge.value,
            gauge.color.hex()
        ),
        (Some(variant), None) => println!("  Variant: {}", variant),
        (None, _) => println!("  Variant: excluded from the feed"),
    }

    println!("----------------------------------------------------------------------");
    println!("Outcomes:");
    for outcome in &detail.ranked_outcomes {
        match outcome.change {
            Some(change) => println!("  {:<30} {:>6}% ({:+})", outcome.name, outcome.probability, change),
            None => println!("  {:<30} {:>6}%", outcome.name, outcome.probability),
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Price history:");
    for entry in legend(mock_price_history()) {
        println!("  {:<30} {:>6}%", entry.outcome, entry.latest);
    }

    let view = CommentView::default();
    let comments = view.apply(mock_comments());
    println!("----------------------------------------------------------------------");
    println!("Comments ({}), sorted by {}:", comments.len(), view.sort);
    for comment in comments {
        println!(
            "  {} {} [{}] {}: {}",
            comment.avatar, comment.username, comment.holdings, comment.time_ago, comment.content
        );
    }
    println!("======================================================================");

    Ok(())
}

/// Serve the feed over HTTP while scrolling a simulated viewport.
async fn cmd_run(
    catalog: Option<String>,
    port_override: Option<u16>,
    scroll_interval: Duration,
) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = load_config(catalog)?;
    if let Some(port) = port_override {
        config.port = port;
    }
    info!("Configuration loaded successfully");

    // Initialize metrics
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    let catalog = load_catalog(&config)?;
    let viewport = Arc::new(ScrollViewport::new(ScrollLayout::from(&config)));

    // Mount the feed
    let feed = FeedBuilder::new(catalog.clone())
        .settings(FeedSettings::from(&config))
        .viewport(viewport.clone())
        .mount();

    // Create app state
    let app_state =
        AppState::new(feed.subscribe(), feed.control(), catalog).with_prometheus(prometheus);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);

    // Spawn HTTP server
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    info!("========================================");
    info!("MARKET FEED STARTED");
    info!("========================================");
    info!("Page size: {}", config.page_size);
    info!("Amplification: x{}", config.amplification_factor);
    info!("Load latency: {}ms", config.load_latency_ms);
    info!("Scroll interval: {}ms", scroll_interval.as_millis());
    info!("========================================");

    // Simulated user: scroll to the bottom until the catalog runs out
    let mut updates = feed.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(scroll_interval) => {
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.has_more {
                    info!(
                        displayed = snapshot.displayed,
                        rendered = snapshot.items.len(),
                        "Reached the end of the feed"
                    );
                    break;
                }
                viewport.scroll_to_end();
            }
        }
    }

    feed.teardown().await;

    // Keep serving the final feed until Ctrl+C
    match server_handle.await {
        Ok(Ok(())) => info!("HTTP server stopped"),
        Ok(Err(e)) => warn!("HTTP server error: {}", e),
        Err(e) => warn!("HTTP server task failed: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}
