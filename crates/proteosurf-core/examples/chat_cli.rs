//! Simple CLI chat example to exercise proteosurf-core end to end
//!
//! Run with:
//! ANTHROPIC_API_KEY="your-key" cargo run -p proteosurf-core --example chat_cli
//!
//! Type `/reset` to clear the conversation, `quit` to exit.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use proteosurf_core::tool_params;
use proteosurf_core::{
    Artifact, SessionConfig, SessionInput, StreamEvent, Tool, ToolDispatcher, ToolError,
    ToolOutput, ToolRegistry, TurnOutcome,
};

/// Toy stand-in for a structure lookup service
struct LookupTool;

#[async_trait]
impl Tool for LookupTool {
    fn name(&self) -> &str {
        "lookup"
    }

    fn description(&self) -> &str {
        "Look up a record by ID and return its contents."
    }

    fn input_schema(&self) -> Value {
        tool_params!(id: "string" => "Record identifier")
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let id = arguments["id"].as_str().unwrap_or("?");
        Ok(ToolOutput::text(format!("Record {}: 42", id)))
    }
}

/// Toy stand-in for a viewer screenshot tool, to exercise the artifact path
struct SnapshotTool;

#[async_trait]
impl Tool for SnapshotTool {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn description(&self) -> &str {
        "Capture a screenshot of the current view."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        // A 1x1 PNG would go here in a real viewer tool
        Ok(ToolOutput::text("{\"status\": \"captured\"}")
            .with_artifact(Artifact::image("aVZCT1J3MEtHZ28=", "snapshot result")))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proteosurf_core=info".into()),
        )
        .init();

    println!("=== Proteosurf CLI Chat ===");
    println!("Type '/reset' to clear the conversation, 'quit' to exit");
    println!();

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(LookupTool))?;
    registry.register(Arc::new(SnapshotTool))?;

    let config = proteosurf_core::Config::default();
    let dispatcher = Arc::new(
        ToolDispatcher::new(Arc::new(registry))
            .with_caps(config.limits.truncation_caps())
            .with_timeout(config.limits.tool_timeout()),
    );
    let session_config = config.clone();
    let (manager, mut event_rx) = proteosurf_core::SessionManager::new(
        move || SessionConfig::from_config(&session_config),
        dispatcher,
    );

    let session_id = "cli";

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }

        manager
            .push_message(session_id, SessionInput::user_message(input))
            .await?;

        while let Some((_sid, event)) = event_rx.recv().await {
            match event {
                StreamEvent::Text { text } => println!("Assistant: {}", text),
                StreamEvent::Tool { name, result, .. } => {
                    if result.is_empty() {
                        println!("  [running {}...]", name);
                    } else {
                        println!("  [{} -> {}]", name, result);
                    }
                }
                StreamEvent::Image { caption, .. } => println!("  [image: {}]", caption),
                StreamEvent::Audio { caption, .. } => println!("  [audio: {}]", caption),
                StreamEvent::System { text } => {
                    println!("[{}]", text);
                    break;
                }
                StreamEvent::Error { message } => println!("Error: {}", message),
                StreamEvent::Done { outcome } => {
                    if outcome == TurnOutcome::RoundBudget {
                        println!("[round budget reached]");
                    }
                    break;
                }
            }
        }
        println!();
    }

    Ok(())
}
