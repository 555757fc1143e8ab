//! project-feed - project-actions demo
//!
//! Reads dispatch requests (one JSON object per line), dispatches them through
//! an action registry, and prints every event a registry-wide listener sees.
//! Events are printed as they are dispatched, so long inputs never outrun the
//! listener.
//!
//! # Usage
//!
//! ```sh
//! # List the action manifest
//! cargo run -p project-feed -- --list
//!
//! # Replay a file, printing only outcomes
//! cargo run -p project-feed -- --input actions.jsonl --only '*Success,*Error'
//!
//! # Pipe from stdin with debug logging
//! echo '{"action":"update","payload":{"name":"api"}}' | cargo run -p project-feed -- -v
//! ```

mod feed;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use project_actions::prelude::*;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::feed::parse_line;

type Registry = ActionRegistry<ProjectAction, Value, ActionLoggerMiddleware>;

/// Replay project actions from JSON lines
#[derive(Parser, Debug)]
#[command(name = "project-feed")]
#[command(about = "Dispatch project actions from JSON lines and print what listeners observe")]
struct Args {
    /// Read requests from a file instead of stdin
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Registry config file (JSON); PROJECT_ACTIONS_* variables are used otherwise
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Only print actions matching these comma-separated glob patterns
    #[arg(long)]
    only: Option<String>,

    /// Print the action manifest and exit
    #[arg(long)]
    list: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if args.list {
        print_manifest();
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => RegistryConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RegistryConfig::from_env().context("reading PROJECT_ACTIONS_* variables")?,
    };
    let registry = Registry::from_config(&config)?;
    let filter = ActionLoggerConfig::new(args.only.as_deref(), None);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut out = std::io::stdout();
    let stats = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            replay(BufReader::new(file), &registry, &filter, &mut out, &cancel).await?
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            replay(stdin, &registry, &filter, &mut out, &cancel).await?
        }
    };

    info!(
        dispatched = stats.dispatched,
        printed = stats.printed,
        unknown = stats.unknown,
        malformed = stats.malformed,
        "feed finished"
    );
    Ok(())
}

#[derive(Debug, Default)]
struct ReplayStats {
    dispatched: usize,
    printed: usize,
    unknown: usize,
    malformed: usize,
}

/// Dispatch every request from `reader`, writing each observed event to `out`
async fn replay<R, W>(
    reader: R,
    registry: &Registry,
    filter: &ActionLoggerConfig,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    // Drained after every dispatch, so it never holds more than one event
    let mut listener = registry.subscribe_all();
    let mut lines = reader.lines();
    let mut stats = ReplayStats::default();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => line.context("reading input")?,
        };
        let Some(line) = line else { break };

        let request = match parse_line(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "skipping line");
                stats.malformed += 1;
                continue;
            }
        };

        match registry.lookup(&request.action) {
            Ok(handle) => {
                handle.dispatch(request.payload);
                stats.dispatched += 1;
                stats.printed += print_events(&mut listener, filter, out)?;
            }
            Err(e) => {
                warn!(error = %e, "skipping line");
                stats.unknown += 1;
            }
        }
    }

    Ok(stats)
}

/// Write buffered events as JSON lines; returns how many passed the filter
fn print_events<W: Write>(
    listener: &mut ActionListener<ProjectAction>,
    filter: &ActionLoggerConfig,
    out: &mut W,
) -> Result<usize> {
    let mut printed = 0;
    loop {
        let event = match listener.try_recv() {
            Ok(Some(event)) => event,
            Ok(None) | Err(ListenError::Closed) => break,
            Err(ListenError::Lagged(skipped)) => {
                warn!(skipped, "printer fell behind");
                continue;
            }
        };
        if !filter.should_log(event.action.name()) {
            continue;
        }
        serde_json::to_writer(&mut *out, &event).context("encoding event")?;
        writeln!(out).context("writing event")?;
        printed += 1;
    }
    Ok(printed)
}

fn print_manifest() {
    for &action in ProjectAction::all() {
        let pairs: Vec<_> = [Outcome::Success, Outcome::Error]
            .into_iter()
            .filter_map(|o| action.counterpart(o))
            .filter(|&pair| pair != action)
            .map(|pair| pair.name())
            .collect();
        println!(
            "{:<22} {:<10} {:<8} {}",
            action.name(),
            format!("{:?}", action.theme()).to_lowercase(),
            format!("{:?}", action.outcome()).to_lowercase(),
            pairs.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry(capacity: usize) -> Registry {
        Registry::from_config(&RegistryConfig::default().with_capacity(capacity)).unwrap()
    }

    fn lines(out: &[u8]) -> Vec<Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_replay_prints_every_event_past_capacity() {
        let registry = registry(4);
        let input: String = (0..500)
            .map(|i| format!("{{\"action\":\"update\",\"payload\":{i}}}\n"))
            .collect();
        let mut out = Vec::new();

        let stats = replay(
            input.as_bytes(),
            &registry,
            &ActionLoggerConfig::default(),
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.dispatched, 500);
        assert_eq!(stats.printed, 500);
        let events = lines(&out);
        assert_eq!(events.len(), 500);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event["action"], "update");
            assert_eq!(event["payload"], json!(i));
            assert_eq!(event["sequence"], json!(i));
        }
    }

    #[tokio::test]
    async fn test_replay_filters_and_counts_bad_lines() {
        let registry = registry(8);
        let input = "# comment\n\
                     {\"action\":\"loadStats\"}\n\
                     {\"action\":\"deleteProject\"}\n\
                     not json\n\
                     {\"action\":\"loadStatsError\",\"payload\":\"timeout\"}\n";
        let mut out = Vec::new();

        let stats = replay(
            input.as_bytes(),
            &registry,
            &ActionLoggerConfig::new(Some("*Error"), None),
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.printed, 1);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(
            lines(&out),
            vec![json!({ "action": "loadStatsError", "payload": "timeout", "sequence": 1 })]
        );
    }

    #[tokio::test]
    async fn test_replay_stops_when_cancelled() {
        let registry = registry(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();

        let stats = replay(
            "{\"action\":\"update\"}\n".as_bytes(),
            &registry,
            &ActionLoggerConfig::default(),
            &mut out,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stats.dispatched, 0);
        assert!(out.is_empty());
    }
}
