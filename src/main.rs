use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tweetlog::args::{CommonArgs, LogLocationArgs, ScrapeArgs};
use tweetlog::baseline::{BaselineLoader, BaselineSource};
use tweetlog::codec;
use tweetlog::config::Config;
use tweetlog::logging::{self, LogConfig};
use tweetlog::pipeline::{self, RunConfig, RunReport};
use tweetlog::retry::RetryPolicy;
use tweetlog::scraper::BrowserScraper;
use tweetlog::theme as t;
use tweetlog::{auth, merge};

// ── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "tweetlog",
    version,
    about = "tweetlog: scrape a timeline and merge new tweets into a flat text log"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a timeline URL and merge new tweets into the log
    Scrape {
        /// Timeline page to scrape
        url: String,
        #[command(flatten)]
        location: LogLocationArgs,
        #[command(flatten)]
        session: ScrapeArgs,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge existing log files (or URLs) into the baseline without a browser
    Merge {
        /// Logs holding the new tweets, in encounter order
        #[arg(required = true, value_name = "URL|PATH")]
        incoming: Vec<String>,
        #[command(flatten)]
        location: LogLocationArgs,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a log file and summarise it
    Show {
        /// Log file to read
        path: PathBuf,
        /// Print the decoded tweets as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    t::init_color(cli.common.no_color);
    logging::init(if cli.common.verbose {
        LogConfig::debug()
    } else {
        LogConfig::from_env()
    });

    let mut config = Config::load(cli.common.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Scrape {
            url,
            location,
            session,
            json,
        } => {
            location.apply_overrides(&mut config);
            session.apply_overrides(&mut config);

            let auth_state = auth::load(&config.auth_file).context("Failed to load auth state")?;
            let scraper = BrowserScraper::new(config.scrape.clone(), auth_state);
            let run = RunConfig {
                url,
                baseline: BaselineSource::parse(&config.baseline_source()),
                output: config.output.clone(),
            };

            let report = pipeline::run(&run, &baseline_loader(&config), &scraper)
                .await
                .with_context(|| format!("Scrape of {} failed", run.url))?;
            print_report(&report, json)?;
        }
        Commands::Merge {
            incoming,
            location,
            json,
        } => {
            location.apply_overrides(&mut config);
            let loader = baseline_loader(&config);

            let baseline = loader
                .load(&BaselineSource::parse(&config.baseline_source()))
                .await;
            let mut fresh = Vec::new();
            for source in &incoming {
                let tweets = loader
                    .load_required(&BaselineSource::parse(source))
                    .await
                    .with_context(|| format!("Failed to load incoming log {source}"))?;
                fresh.extend(tweets);
            }

            let report = pipeline::merge_and_publish(baseline, &fresh, config.output.clone())
                .await
                .context("Merge failed")?;
            print_report(&report, json)?;
        }
        Commands::Show { path, json } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let decoded = codec::decode_report(&text);
            if json {
                println!("{}", serde_json::to_string_pretty(&decoded.tweets)?);
            } else {
                let distinct = merge::dedup(decoded.tweets.iter().cloned()).len();
                println!("{}", t::heading(&path.display().to_string()));
                println!("{}", t::label_value("Tweets", &decoded.tweets.len().to_string()));
                println!("{}", t::label_value("Distinct", &distinct.to_string()));
                if decoded.dropped > 0 {
                    println!(
                        "{}",
                        t::icon_warn(&format!("{} malformed entries skipped", decoded.dropped))
                    );
                }
            }
        }
    }

    Ok(())
}

fn baseline_loader(config: &Config) -> BaselineLoader {
    BaselineLoader::new(
        Duration::from_secs(config.fetch.timeout_secs),
        RetryPolicy::baseline_fetch(config.fetch.max_attempts),
    )
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match &report.written_to {
        Some(path) => println!(
            "{}",
            t::icon_ok(&format!("Saved {} tweets to {}", report.total, path.display()))
        ),
        None => println!("{}", t::icon_warn("No tweets found.")),
    }
    println!("{}", t::label_value("Baseline", &report.baseline.to_string()));
    println!("{}", t::label_value("Scraped", &report.scraped.to_string()));
    println!("{}", t::label_value("New", &report.inserted.to_string()));
    Ok(())
}
