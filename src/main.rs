use clap::Parser;
use colored::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gemini_fc::agent::{ConversationAgent, TurnOutcome};
use gemini_fc::api::GeminiClient;
use gemini_fc::cli::Args;
use gemini_fc::config::defaults::default_session_ttl_minutes;
use gemini_fc::config::{parse_bool, Config, FileConfig};
use gemini_fc::error::Result;
use gemini_fc::generate::ContentGenerator;
use gemini_fc::hass::HomeAssistantClient;
use gemini_fc::models::ConversationInput;
use gemini_fc::session::{FilesystemSessionStore, SessionStore};
use gemini_fc::ui::{display_action, display_conversation_id, display_error, display_result};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            display_error(&e.to_string());
            process::exit(1);
        }
    }
}

fn init_tracing(args: &Args) {
    let verbose = args.verbose
        || std::env::var("GEMINI_FC_VERBOSE")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);
    let default_level = if verbose { "gemini_fc=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<i32> {
    if args.config_init {
        let path = FileConfig::init()?;
        println!(
            "{}",
            format!("Wrote example configuration to {}", path.display()).green()
        );
        return Ok(0);
    }

    if args.clear_history {
        FilesystemSessionStore::in_cache_dir(default_session_ttl_minutes())?.clear_all()?;
        println!("{}", "All conversation history cleared.".green());
        return Ok(0);
    }

    let config = Config::from_env_and_args(&args)?;
    let client = GeminiClient::from_config(&config)?;

    if args.verify {
        let info = client.verify_model(&config.chat_model).await?;
        let name = info.display_name.unwrap_or(info.name);
        println!("{}", format!("API key OK, model available: {}", name).green());
        return Ok(0);
    }

    if args.generate || !args.images.is_empty() {
        return generate(&args, &config, &client).await;
    }

    if args.command.is_empty() && !args.interactive {
        print_usage();
        return Ok(1);
    }

    let store = Arc::new(FilesystemSessionStore::in_cache_dir(
        config.session.ttl_minutes,
    )?);
    let host = Arc::new(HomeAssistantClient::from_config(&config)?);
    let agent = ConversationAgent::from_config(&config, Arc::new(client), host, store.clone());

    let language = args
        .language
        .clone()
        .unwrap_or_else(|| config.language.clone());
    let mut conversation_id = if args.conversation_id.is_some() {
        args.conversation_id.clone()
    } else if args.new_conversation {
        None
    } else {
        store.find_recent()?.map(|s| s.conversation_id)
    };

    if !args.interactive {
        let text = args.command.join(" ");
        let outcome = agent
            .run_turn(ConversationInput::new(text, conversation_id, language))
            .await?;
        print_outcome(&outcome, &args, &config)?;
        return Ok(if outcome.result.response.is_error() { 1 } else { 0 });
    }

    let stdin = io::stdin();
    prompt_marker();
    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if !text.is_empty() {
            let outcome = agent
                .run_turn(ConversationInput::new(
                    text,
                    conversation_id.clone(),
                    language.clone(),
                ))
                .await?;
            print_outcome(&outcome, &args, &config)?;
            conversation_id = Some(outcome.result.conversation_id);
        }
        prompt_marker();
    }
    Ok(0)
}

async fn generate(args: &Args, config: &Config, client: &GeminiClient) -> Result<i32> {
    let prompt = args.command.join(" ");
    let images: Vec<PathBuf> = args.images.iter().map(PathBuf::from).collect();
    let generated = ContentGenerator::from_config(client, config)
        .generate_content(&prompt, &images)
        .await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&generated)?);
    } else {
        println!("{}", generated.text);
    }
    Ok(0)
}

fn print_outcome(outcome: &TurnOutcome, args: &Args, config: &Config) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.result)?);
        return Ok(());
    }
    if let Some(dispatched) = &outcome.dispatched {
        display_action(dispatched);
    }
    display_result(&outcome.result);
    if config.verbose {
        display_conversation_id(&outcome.result.conversation_id);
    }
    Ok(())
}

fn prompt_marker() {
    eprint!("{}", "> ".dimmed());
    let _ = io::stderr().flush();
}

fn print_usage() {
    eprintln!("{}", "Usage: gemini-fc [OPTIONS] <text>".red());
    eprintln!(
        "{}",
        "  -n, --new                  Start a new conversation".dimmed()
    );
    eprintln!(
        "{}",
        "      --conversation-id <ID> Continue a specific conversation".dimmed()
    );
    eprintln!(
        "{}",
        "  -i, --interactive          Read one turn per line from stdin".dimmed()
    );
    eprintln!(
        "{}",
        "      --generate             Generate content without function calling".dimmed()
    );
    eprintln!(
        "{}",
        "      --image <FILE>         Attach an image (implies --generate)".dimmed()
    );
    eprintln!(
        "{}",
        "      --clear                Clear all conversation history".dimmed()
    );
    eprintln!(
        "{}",
        "      --verify               Check the API key and model".dimmed()
    );
}
