//! Cyber Good News: binary entrypoint.
//! Loads `.env`, wires collectors, scorer, storage and Discord, then runs the
//! collection loop next to the admin HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cyber_good_news::config::AppConfig;
use cyber_good_news::ingest::config::{load_feeds_default, load_feeds_from};
use cyber_good_news::ingest::rss::RssCollector;
use cyber_good_news::ingest::types::Collector;
use cyber_good_news::metrics::Metrics;
use cyber_good_news::notify::DiscordNotifier;
use cyber_good_news::scoring::RulesHandle;
use cyber_good_news::storage::StoryDatabase;
use cyber_good_news::{api, init_tracing, App, PositiveScorer};

#[derive(Debug, Parser)]
#[command(name = "cyber-good-news", version, about = "Positive cybersecurity news monitor")]
struct Cli {
    /// Run a single collection cycle and exit.
    #[arg(long)]
    once: bool,

    /// Do not start the admin HTTP server.
    #[arg(long)]
    no_server: bool,
}

const SETUP_HINT: &str = "Setup: copy .env.example to .env and set DISCORD_WEBHOOK_URL \
(Discord: Server Settings -> Integrations -> Webhooks -> New Webhook).";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        eprintln!("configuration error: {e}");
        eprintln!("{SETUP_HINT}");
        std::process::exit(2);
    }

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let db = StoryDatabase::open(&config.database_path)?;
    let rules = Arc::new(RulesHandle::from_path(&config.rules_path));
    let scorer = PositiveScorer::new(rules.clone(), config.min_impact_score);

    let feeds = match &config.feeds_path {
        Some(path) => load_feeds_from(path)?,
        None => load_feeds_default()?,
    };
    tracing::info!(feeds = feeds.len(), "feed list loaded");
    let collectors: Vec<Box<dyn Collector>> = vec![Box::new(RssCollector::new(feeds))];
    let notifier = Arc::new(DiscordNotifier::new(config.discord_webhook_url.clone()));

    let mut app = App::new(&config, db.clone(), scorer, notifier, collectors);

    if cli.once {
        let report = app.run_once().await?;
        println!(
            "cycle done: scanned={} positive={} new={} sent={}",
            report.scanned, report.positive, report.new_saved, report.sent
        );
        return Ok(());
    }

    if !cli.no_server {
        let router = api::router(
            api::AppState::new(db, rules),
            metrics.as_ref().map(|m| m.handle.clone()),
        );
        let listener = tokio::net::TcpListener::bind(config.http_addr)
            .await
            .with_context(|| format!("binding admin server on {}", config.http_addr))?;
        tracing::info!(addr = %config.http_addr, "admin server listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = ?e, "admin server stopped");
            }
        });
    }

    app.run_continuous(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;
    Ok(())
}
