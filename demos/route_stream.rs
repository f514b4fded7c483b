//! Stream Routing Example
//!
//! Builds a framed stream of messages, reads it back in small chunks, and
//! routes each message with a YAML-configured router.
//!
//! Run with: `cargo run --example route_stream`

use anyhow::Context;
use heka_matcher::{Encoder, EngineConfig, Router, StreamReader};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ROUTES: &str = r#"
matcher:
  max_tests: 16
routes:
  - name: errors
    matcher: "Severity <= 3"
  - name: web
    matcher: "Logger == 'nginx' || Logger == 'apache'"
  - name: slow
    matcher: "Fields[latency] > 1.0"
  - name: audit
    matcher: "Type =~ '^audit%.'"
"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::default();
    config.validate().context("engine configuration")?;
    let router = Router::from_yaml_str(ROUTES).context("loading routes")?;
    info!(routes = router.len(), "router ready");

    let mut encoder = Encoder::with_config(&config.codec)?;
    let mut stream = Vec::new();
    let loggers = ["nginx", "apache", "sshd", "cron"];
    for i in 0..200 {
        let description = json!({
            "Type": if i % 10 == 0 { "audit.login" } else { "log" },
            "Logger": loggers[i % loggers.len()],
            "Severity": i % 8,
            "Fields": {"latency": (i % 7) as f64 * 0.4}
        });
        stream.extend(encoder.encode_framed(&description)?);
    }
    // Corrupt bytes between records are skipped by the reader
    let tail = stream.split_off(100);
    stream.extend_from_slice(b"garbage");
    stream.extend(tail);

    let mut reader = StreamReader::with_config(&config.codec)?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0;
    let mut discarded = 0;
    for chunk in stream.chunks(512) {
        reader.append(chunk)?;
        loop {
            let routed = reader.next_message().map(|message| router.route(message));
            discarded += reader.discarded();
            let Some(names) = routed else { break };
            total += 1;
            for name in names {
                *counts.entry(name.to_string()).or_default() += 1;
            }
        }
    }

    info!(total, discarded, "stream consumed");
    println!("📬 Routed {total} messages ({discarded} bytes discarded)");
    for (name, count) in &counts {
        println!("  {name:>8}: {count}");
    }

    Ok(())
}
