use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "gemini-fc")]
#[command(about = "Talk to your Home Assistant through Gemini function calling", long_about = None)]
pub struct Args {
    #[arg(short = 'n', long = "new", help = "Start a new conversation")]
    pub new_conversation: bool,

    #[arg(
        long = "conversation-id",
        help = "Continue the conversation with this id"
    )]
    pub conversation_id: Option<String>,

    #[arg(long = "language", help = "Language tag of the utterance (default: en)")]
    pub language: Option<String>,

    #[arg(short = 'i', long = "interactive", help = "Read one turn per line from stdin")]
    pub interactive: bool,

    #[arg(long = "json", help = "Print the conversation result as JSON")]
    pub json: bool,

    #[arg(long = "clear", help = "Clear all stored conversations")]
    pub clear_history: bool,

    #[arg(long = "config-init", help = "Write an example config file")]
    pub config_init: bool,

    #[arg(long = "verify", help = "Check the API key and chat model, then exit")]
    pub verify: bool,

    #[arg(
        long = "generate",
        help = "Generate content from the prompt (and images) without function calling"
    )]
    pub generate: bool,

    #[arg(long = "image", help = "Image file to send with --generate (repeatable)")]
    pub images: Vec<String>,

    #[arg(
        long = "api-endpoint",
        help = "Custom Generative Language API base URL"
    )]
    pub api_endpoint: Option<String>,

    #[arg(long = "hass-url", help = "Home Assistant base URL")]
    pub hass_url: Option<String>,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(help = "Text to send to the assistant")]
    pub command: Vec<String>,
}
