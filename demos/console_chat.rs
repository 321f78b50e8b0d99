//! # Console Chat Example
//!
//! Runs the bundled coaching program in the terminal, with one chat and a
//! canned content generator. Each line you type is one inbound update:
//! plain text, a `/command`, or `!data` to press the inline button whose
//! callback data is `data`.
//!
//! # Usage
//! ```bash
//! cargo run --example console_chat
//! RUST_LOG=coachsm=debug cargo run --example console_chat
//! COACHSM_FLOWS=./config/flows.yaml cargo run --example console_chat
//! COACHSM_DB=./sessions.db cargo run --example console_chat
//! ```

use std::sync::Arc;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use coachsm::{
    Affordance, ChatId, Dispatcher, EngineBuilder, FlowConfig, Inbound, MessageRef,
    MockContentGenerator, RetryingGenerator, SqliteSessionStore, Transport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const CHAT_ID: ChatId = 1;

/// Prints outbound messages and their affordances to stdout.
struct ConsoleTransport {
    next_id: AtomicI64,
}

impl ConsoleTransport {
    fn render(affordance: &Affordance) -> String {
        match affordance {
            Affordance::Inline(rows) => rows.iter()
                .map(|row| row.iter()
                    .map(|b| format!("[{} → !{}]", b.text, b.callback))
                    .collect::<Vec<_>>()
                    .join(" "))
                .collect::<Vec<_>>()
                .join("\n  "),
            Affordance::Reply(rows) => rows.iter()
                .map(|row| format!("⌨ {}", row.join(" | ")))
                .collect::<Vec<_>>()
                .join("\n  "),
            Affordance::RemoveReply => "(keyboard removed)".to_string(),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, chat_id: ChatId, text: &str, affordance: Option<&Affordance>) -> Result<MessageRef, String> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        println!("\n🤖 {}", text);
        if let Some(affordance) = affordance {
            println!("  {}", Self::render(affordance));
        }
        Ok(MessageRef { chat_id, message_id })
    }

    async fn edit_affordance(&self, message: &MessageRef, affordance: &Affordance) -> Result<(), String> {
        println!("  (message {} now shows) {}", message.message_id, Self::render(affordance));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== coachsm-rs Console Chat ===");
    println!("Type text, /commands (/progress, /mode, /learn), or !data to press a button. Ctrl-D quits.\n");

    let flows = match std::env::var("COACHSM_FLOWS") {
        Ok(path) => FlowConfig::from_path(&path)?,
        Err(_) => FlowConfig::bundled()?,
    };

    let content = Arc::new(RetryingGenerator::new(Arc::new(MockContentGenerator::canned()), 2));

    let mut builder = EngineBuilder::new()
        .flow_config(flows)
        .transport(Arc::new(ConsoleTransport { next_id: AtomicI64::new(1) }))
        .content(content);

    if let Ok(path) = std::env::var("COACHSM_DB") {
        let store = SqliteSessionStore::new(&path).map_err(|e| anyhow::anyhow!("{}", e))?;
        builder = builder.store(Arc::new(store));
    }

    let dispatcher = Dispatcher::new(Arc::new(builder.build()?));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let input = match line.strip_prefix('!') {
            Some(data) => Inbound::Callback(data.to_string()),
            None => Inbound::parse(line),
        };

        match dispatcher.route(CHAT_ID, input).await {
            Ok(cycle) => {
                if cycle.is_faulted() {
                    let fault = cycle.fault.as_ref().map(|f| f.to_string()).unwrap_or_default();
                    eprintln!("  [fault: {}]", fault);
                }
                let path: Vec<&str> = cycle.trace.path().iter().map(|s| s.as_str()).collect();
                println!("  [{} · {}]", cycle.session.scope(), path.join(" → "));
            }
            Err(e) => eprintln!("  [error: {}]", e),
        }
    }

    println!("\nBye!");
    Ok(())
}
