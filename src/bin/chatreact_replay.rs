//! chatreact replay
//!
//! Runs the rules of a watcher config against a recorded batch of chat
//! messages and prints how often each rule fired.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatreact::{ChatMessage, ChatWatcher, InMemorySource, WatcherConfig};

struct Args {
    config: PathBuf,
    messages: PathBuf,
}

fn usage() -> ! {
    println!("chatreact-replay - run chat rules against recorded messages");
    println!();
    println!("USAGE:");
    println!("    chatreact-replay --config <FILE> --messages <FILE>");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>       Watcher config (JSON)");
    println!("    -m, --messages <FILE>     JSON array of chat messages");
    println!("    -h, --help                Print help information");
    std::process::exit(0);
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config = None;
    let mut messages = None;

    let mut i = 1;
    while i < args.len() {
        let slot = match args[i].as_str() {
            "--config" | "-c" => &mut config,
            "--messages" | "-m" => &mut messages,
            "--help" | "-h" => usage(),
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        };
        let Some(value) = args.get(i + 1) else {
            eprintln!("error: {} requires a value", args[i]);
            std::process::exit(1);
        };
        *slot = Some(PathBuf::from(value));
        i += 2;
    }

    match (config, messages) {
        (Some(config), Some(messages)) => Args { config, messages },
        _ => {
            eprintln!("error: --config and --messages are required");
            std::process::exit(1);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatreact=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args();
    let config = WatcherConfig::from_path(&args.config)?;
    let text = std::fs::read_to_string(&args.messages)?;
    let messages: Vec<ChatMessage> = serde_json::from_str(&text)?;
    let total = messages.len();

    let watcher = ChatWatcher::from_config(InMemorySource::with_messages(messages), &config)?;

    let mut counters = Vec::new();
    for (name, trigger) in config.compile_rules()? {
        let hits = Arc::new(AtomicUsize::new(0));
        let rule_hits = Arc::clone(&hits);
        let rule = name.clone();
        watcher.add_named_listener(name.clone(), trigger, move |detail, message| {
            rule_hits.fetch_add(1, Ordering::Relaxed);
            info!(
                rule = %rule,
                message = %message.id(),
                user = message.username().unwrap_or("?"),
                text = detail.text(),
                "rule matched"
            );
            Ok(())
        })?;
        counters.push((name, hits));
    }

    let report = watcher.poll_once()?;
    println!("replayed {} of {total} messages, {} responses", report.messages, report.responses);
    for (name, hits) in &counters {
        println!("{name:>24}  {}", hits.load(Ordering::Relaxed));
    }
    Ok(())
}
