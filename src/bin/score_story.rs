//! Score one headline against the lexicon and print the resulting story as JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use cyber_good_news::ingest::story_id;
use cyber_good_news::scoring::rules::{default_rules_path, load};
use cyber_good_news::scoring::{analyze_story, classify};
use cyber_good_news::{init_tracing, Story};

#[derive(Debug, Parser)]
#[command(name = "score-story", about = "Score a single story with the positive lexicon")]
struct Args {
    /// Story headline.
    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "cli")]
    source: String,

    #[arg(long, default_value = "https://example.invalid/story")]
    url: String,

    /// Lexicon file (defaults to $SCORING_RULES_PATH or config/positive_scoring.toml).
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Also print the gate verdict and signal counts to stderr.
    #[arg(long)]
    explain: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let rules = load(&args.rules.unwrap_or_else(default_rules_path));
    let mut story = Story::new(
        story_id(&args.url),
        args.title,
        args.description,
        args.source,
        args.url,
        Utc::now(),
    );

    if args.explain {
        let c = classify(&story, &rules);
        eprintln!(
            "{}",
            serde_json::to_string(&c).context("encoding classification")?
        );
    }

    analyze_story(&mut story, &rules)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&story).context("encoding story")?
    );
    Ok(())
}
