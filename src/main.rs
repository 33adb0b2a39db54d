use std::io::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use noddy_chat::{BackendClient, ChatSession, Config, VoiceBackends, VoiceController, models};

/// Noddy - conversational chat and voice client
#[derive(Parser)]
#[command(name = "noddy", version, about)]
struct Cli {
    /// Backend base URL (e.g. http://localhost:8000)
    #[arg(long, env = "NODDY_API_URL")]
    api_url: Option<String>,

    /// Chat model identifier (see `noddy models`)
    #[arg(short, long, env = "NODDY_MODEL")]
    model: Option<String>,

    /// Speak replies out loud
    #[arg(long)]
    voice: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the available chat models
    Models {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Speak a line of text (remote TTS, local fallback)
    Speak {
        /// Text to speak
        #[arg(default_value = "Hi there! I'm Noddy.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,noddy_chat=info",
        1 => "info,noddy_chat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if cli.voice {
        config.voice.output_enabled = true;
    }

    let client = BackendClient::new(config.api_url.clone());

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Models { json } => cmd_models(json),
            Command::Speak { text } => cmd_speak(client, &config, &text).await,
        };
    }

    chat_loop(client, config).await
}

/// List the model catalog
fn cmd_models(json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&models::MODELS)?);
    } else {
        for model in &models::MODELS {
            let marker = if model.id == models::DEFAULT_MODEL {
                "*"
            } else {
                " "
            };
            println!("{marker} {:40} {}", model.id, model.name);
        }
    }
    Ok(())
}

/// Speak one line and wait for playback to finish
async fn cmd_speak(client: BackendClient, config: &Config, text: &str) -> anyhow::Result<()> {
    let mut controller =
        VoiceController::new(client, config.voice.clone(), VoiceBackends::detect());

    controller.speak(text).await;

    while controller.is_speaking() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}

/// Interactive chat loop - the terminal rendition of the chat widget
#[allow(clippy::too_many_lines)]
async fn chat_loop(client: BackendClient, config: Config) -> anyhow::Result<()> {
    use tokio::io::AsyncBufReadExt;

    let mut session = ChatSession::new(client.clone());
    let mut voice = VoiceController::new(client, config.voice.clone(), VoiceBackends::detect());
    let mut model = config.model.clone();

    println!("Noddy ready (model: {model}, backend: {})", config.api_url);
    println!("Commands: /model <id>, /models, /voice on|off, /quit");
    println!();
    println!("noddy> {}", session.messages()[0].content);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    prompt();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        if input.is_empty() {
            prompt();
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match command.split_whitespace().collect::<Vec<_>>().as_slice() {
                ["quit" | "exit"] => break,
                ["models"] => {
                    cmd_models(false)?;
                }
                ["model", id] => {
                    if models::find(id).is_some() {
                        model = (*id).to_string();
                        println!("model set to {model}");
                    } else {
                        println!("unknown model {id} (see /models)");
                    }
                }
                ["voice", "on"] => {
                    voice.set_voice_output_enabled(true);
                    println!("voice replies on");
                }
                ["voice", "off"] => {
                    voice.set_voice_output_enabled(false);
                    voice.cancel_speech();
                    println!("voice replies off");
                }
                _ => println!("commands: /model <id>, /models, /voice on|off, /quit"),
            }
            prompt();
            continue;
        }

        match session.send_message(input, &model).await {
            Some(reply) => {
                for thought in reply.thoughts.iter().flatten() {
                    println!("  · {thought}");
                }
                println!("noddy> {}", reply.response);

                if voice.voice_output_enabled() {
                    voice.speak(&reply.response).await;
                }
            }
            None => {
                // The session already appended the apology; show it
                if let Some(last) = session.messages().last() {
                    println!("noddy> {}", last.content);
                }
                if let Some(error) = session.error() {
                    tracing::warn!(error, "chat request failed");
                }
            }
        }

        prompt();
    }

    Ok(())
}

/// Print the input prompt without a newline
fn prompt() {
    print!("you> ");
    let _ = std::io::stdout().flush();
}
