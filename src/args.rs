use crate::config::Config;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args};
use std::path::PathBuf;

// Global flags shared across every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to a config.toml file (default: ~/.tweetlog/config.toml)
    #[arg(
        short = 'c',
        long,
        value_name = "PATH",
        env = "TWEETLOG_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Disable coloured terminal output
    #[arg(
        long = "no-color",
        action = ArgAction::SetTrue,
        env = "NO_COLOR",
        value_parser = FalseyValueParser::new(),
        global = true
    )]
    pub no_color: bool,

    /// Debug-level logging
    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    pub verbose: bool,
}

/// Flags that override where logs are read from and written to.
#[derive(Debug, Clone, Default, Args)]
pub struct LogLocationArgs {
    /// Merged log to write (default: tweets.txt)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Existing log to merge into: URL or path (default: the output file)
    #[arg(short, long, value_name = "URL|PATH", env = "TWEETLOG_BASELINE")]
    pub baseline: Option<String>,
}

impl LogLocationArgs {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(baseline) = &self.baseline {
            config.baseline = Some(baseline.clone());
        }
    }
}

/// Browser session overrides for `scrape`.
#[derive(Debug, Clone, Default, Args)]
pub struct ScrapeArgs {
    /// Number of scroll rounds
    #[arg(long = "scrolls", value_name = "N")]
    pub scroll_count: Option<u32>,

    /// Saved browser storage state (default: auth.json)
    #[arg(long = "auth", value_name = "PATH")]
    pub auth_file: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, action = ArgAction::SetTrue)]
    pub headed: bool,
}

impl ScrapeArgs {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(count) = self.scroll_count {
            config.scrape.scroll_count = count;
        }
        if let Some(auth_file) = &self.auth_file {
            config.auth_file = auth_file.clone();
        }
        if self.headed {
            config.scrape.headless = false;
        }
    }
}
