use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;

use rssreader::config::Config;
use rssreader::feed::{build_client, group_items, read_feeds};
use rssreader::output::{export_json, render_text};

const AFTER_HELP: &str = "\
Only URL addresses are accepted as arguments.

Output order:
  Results are displayed per alphabetically sorted RSS channel.
  RSS items for each channel are sorted by publishing date in descending order.

The whole run fails on the first feed that cannot be fetched or decoded.";

#[derive(Parser, Debug)]
#[command(
    name = "rssreader",
    version,
    about = "Parse and display RSS content",
    after_help = AFTER_HELP
)]
struct Args {
    /// RSS feed URLs to read
    #[arg(required = true, value_name = "URL")]
    urls: Vec<String>,

    /// Config file (default: ~/.config/rssreader/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the rss_items_<timestamp>.json export
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Do not write the JSON export
    #[arg(long)]
    no_json: bool,

    /// Do not print items to stdout
    #[arg(short, long)]
    quiet: bool,

    /// Per-feed timeout in seconds (0 disables the timeout)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of feeds fetched at the same time
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    jobs: Option<u64>,
}

impl Args {
    /// Applies command-line overrides on top of the loaded config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.no_json {
            config.write_json = false;
        }
        if self.quiet {
            config.print = false;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
        if let Some(jobs) = self.jobs {
            config.concurrency = usize::try_from(jobs).unwrap_or(usize::MAX);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the item listing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let config = args.apply(config);

    let options = config.read_options();
    let client = build_client(&config.user_agent, options.fetch.host_policy)
        .context("Failed to create HTTP client")?;

    // Ctrl-C cancels every in-flight request of the run
    let items = tokio::select! {
        result = read_feeds(&client, &args.urls, &options) => result?,
        () = wait_for_interrupt(tokio::signal::ctrl_c()) => anyhow::bail!("Interrupted"),
    };

    let grouped = group_items(items);
    tracing::info!(
        channels = grouped.len(),
        items = grouped.item_count(),
        "Grouped items"
    );

    if config.print {
        let stdout = std::io::stdout();
        render_text(&grouped, &mut stdout.lock()).context("Failed to write to stdout")?;
    }

    if config.write_json {
        let path = export_json(&grouped, &config.output_dir, Utc::now())
            .context("Failed to export items as JSON")?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}

/// Resolves once `signal` fires.
///
/// If the handler cannot be installed this never resolves, so the run goes on
/// without Ctrl-C support instead of aborting.
async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_resolves_when_signal_fires() {
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            wait_for_interrupt(async { Ok(()) }),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_interrupt_handler_failure_does_not_cancel_run() {
        let failed_signal = async { Err(std::io::Error::other("no signal handler")) };
        let outcome = tokio::select! {
            () = wait_for_interrupt(failed_signal) => "interrupted",
            () = tokio::time::sleep(std::time::Duration::from_millis(50)) => "completed",
        };
        assert_eq!(outcome, "completed");
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_urls_required() {
        assert!(Args::try_parse_from(["rssreader"]).is_err());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Args::try_parse_from(["rssreader", "--jobs", "0", "http://a/"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "rssreader",
            "--no-json",
            "-q",
            "--timeout",
            "0",
            "-j",
            "4",
            "-o",
            "/tmp/out",
            "http://a/rss",
            "http://b/rss",
        ])
        .unwrap();

        let config = args.apply(Config::default());
        assert_eq!(args.urls, vec!["http://a/rss", "http://b/rss"]);
        assert!(!config.write_json);
        assert!(!config.print);
        assert_eq!(config.request_timeout_secs, 0);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["rssreader", "http://a/rss"]).unwrap();
        assert_eq!(args.apply(Config::default()), Config::default());
    }
}
