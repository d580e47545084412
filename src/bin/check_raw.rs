use colored::*;
use serde_json::json;
use std::env;

use gemini_fc::actions::ActionRegistry;
use gemini_fc::api::GeminiClient;
use gemini_fc::config::defaults::{default_chat_model, default_request_timeout, DEFAULT_API_ENDPOINT};
use gemini_fc::config::ActionsConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Get command line args
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <prompt> [--tools]", args[0]);
        std::process::exit(1);
    }

    let prompt = &args[1];
    let use_tools = args.len() > 2 && args[2] == "--tools";

    // Get API key
    let api_key = env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("Error: GEMINI_API_KEY environment variable not set");
        std::process::exit(1);
    });

    let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| default_chat_model());
    let endpoint =
        env::var("GEMINI_API_ENDPOINT").unwrap_or_else(|_| DEFAULT_API_ENDPOINT.to_string());

    println!("{}", format!("Using model: {}", model).green());
    println!("{}", format!("Prompt: {}", prompt).cyan());
    println!(
        "{}",
        format!("Tools: {}", if use_tools { "Enabled" } else { "Disabled" }).yellow()
    );
    println!("{}", "-".repeat(80).dimmed());

    let mut request_body = json!({
        "contents": [
            {"role": "user", "parts": [{"text": prompt}]}
        ]
    });

    if use_tools {
        let registry = ActionRegistry::from_config(&ActionsConfig::default());
        request_body["tools"] = serde_json::to_value(registry.tools())?;
    }

    println!("{}", "Request payload:".bold());
    println!("{}", serde_json::to_string_pretty(&request_body)?);
    println!("{}", "-".repeat(80).dimmed());

    let client = GeminiClient::new(&api_key, &endpoint, default_request_timeout())?;
    let response = match client.generate_raw(&model, &request_body).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            std::process::exit(1);
        }
    };

    println!("{}", "Raw response:".bold());
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!("{}", "-".repeat(80).dimmed());

    // Highlight specific fields
    if let Some(candidates) = response["candidates"].as_array() {
        for candidate in candidates {
            if let Some(reason) = candidate["finishReason"].as_str() {
                println!("{}: {}", "Finish reason".cyan(), reason);
            }
            let parts = candidate["content"]["parts"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            for part in parts {
                if let Some(text) = part["text"].as_str() {
                    println!("{}: {}", "Text".yellow(), text);
                }
                if let Some(call) = part.get("functionCall") {
                    println!("{}: {}", "Function call".magenta(), call);
                }
            }
        }
    }
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        println!("{}: {}", "Blocked".red(), reason);
    }

    Ok(())
}
