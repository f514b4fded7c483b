//! Encode and Decode Example
//!
//! Encodes a message from a JSON description, decodes it back, and evaluates
//! a few matcher expressions against it.
//!
//! Run with: `cargo run --example encode_decode`
//! Set `RUST_LOG=heka_matcher=trace` to see matcher compilation.

use anyhow::Context;
use heka_matcher::{decode, Encoder, MessageMatcher};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("📦 Heka Encode/Decode Example");
    println!("=============================\n");

    let description = json!({
        "Type": "nginx.access",
        "Logger": "nginx",
        "Severity": 6,
        "Hostname": "web-01",
        "Payload": "GET /index.html HTTP/1.1",
        "Fields": {
            "status": 503,
            "path": "/index.html",
            "latency": {"value": 0.125, "representation": "s"},
            "tags": ["edge", "eu-west"]
        }
    });

    let mut encoder = Encoder::new();
    let bytes = encoder
        .encode(&description)
        .context("encoding message description")?
        .to_vec();
    println!("Encoded {} bytes", bytes.len());

    let message = decode(&bytes).context("decoding encoded message")?;
    println!(
        "Decoded message:\n{}\n",
        serde_json::to_string_pretty(&message.to_json())?
    );

    let expressions = [
        "Logger == 'nginx' && Fields[status] >= 500",
        "Fields[tags][0][1] == 'eu-west'",
        "Payload =~ '^GET /%w+%.html'",
        "Fields[latency] < 0.1",
        "Hostname =~ 'web'% && Pid == NIL",
    ];
    for expression in expressions {
        let matcher = MessageMatcher::compile(expression)
            .with_context(|| format!("compiling {expression:?}"))?;
        let verdict = if matcher.evaluate(&message) { "✅" } else { "❌" };
        println!("{verdict} {expression}");
    }

    Ok(())
}
