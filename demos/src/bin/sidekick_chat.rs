//! Interactive Sidekick session against an OpenAI-compatible endpoint.
//!
//! ```text
//! OPENAI_API_KEY=... cargo run -p sidekick-demos --bin sidekick_chat -- "Answer must cite a source"
//! ```
//!
//! Type a request per line. `/reset` starts a new thread, `/history` lists
//! the steps taken so far, `/retry` resumes a turn that failed mid-run.

use std::sync::Arc;

use anyhow::Context;
use chrono::format::{Item, StrftimeItems};
use serde_json::{json, Value};
use sidekick_agent::{Sidekick, SidekickConfig};
use sidekick_core::{Tool, ToolError};
use sidekick_graph::Observer;
use sidekick_llm::OpenAiCompatibleBuilder;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEFAULT_CRITERIA: &str = "The answer should be clear and accurate";

struct CurrentTime;

#[async_trait::async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Returns the current date and time. Accepts an optional strftime `format`."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {"type": "string", "description": "strftime pattern"}
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let now = chrono::Local::now();
        let text = match args.get("format").and_then(Value::as_str) {
            Some(format) => {
                let items: Vec<Item> = StrftimeItems::new(format).collect();
                if items.iter().any(|item| matches!(item, Item::Error)) {
                    return Err(ToolError::InvalidArguments(format!("bad format: {format}")));
                }
                now.format_with_items(items.into_iter()).to_string()
            }
            None => now.to_rfc2822(),
        };
        Ok(Value::String(text))
    }
}

/// Prints tool traffic so the user can follow what the worker is doing.
struct ToolEcho;

#[async_trait::async_trait]
impl Observer for ToolEcho {
    async fn on_tool_call(&self, _node_id: &str, tool_name: &str, args: &Value) {
        println!("  -> {tool_name}({args})");
    }

    async fn on_tool_result(&self, _node_id: &str, _tool_name: &str, result: &str) {
        println!("  <- {result}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let criteria = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CRITERIA.to_string());

    let llm = OpenAiCompatibleBuilder::from_env()?
        .build()
        .context("failed to build the chat client")?;
    let model = llm.model().to_string();
    let sidekick = Sidekick::builder()
        .llm(Arc::new(llm))
        .tool(Arc::new(CurrentTime))
        .observer(Arc::new(ToolEcho))
        .config(SidekickConfig {
            worker_model: model.clone(),
            evaluator_model: model,
            ..SidekickConfig::default()
        })
        .build()?;

    let mut thread_id = sidekick.reset();
    println!("Sidekick ready (criteria: {criteria})");
    println!("thread {thread_id}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/reset" => {
                thread_id = sidekick.reset();
                println!("thread {thread_id}");
                continue;
            }
            "/history" => {
                for entry in sidekick.history(&thread_id).await? {
                    println!("  #{} {} at {}", entry.seq, entry.node, entry.created_at);
                }
                continue;
            }
            _ => {}
        }

        let outcome = if line == "/retry" {
            sidekick.resume(&thread_id).await
        } else {
            sidekick.run(line, criteria.as_str(), &thread_id).await
        };
        match outcome {
            Ok(reply) => {
                println!("{}", reply.answer);
                println!("[evaluator] {}", reply.feedback);
            }
            Err(err) => {
                tracing::error!(error = %err, "turn failed");
                println!("turn failed: {err} (type /retry to resume)");
            }
        }
    }
    Ok(())
}
