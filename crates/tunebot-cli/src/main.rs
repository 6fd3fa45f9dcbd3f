use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tunebot_core::assistant::{SUGGESTED_QUESTIONS, WELCOME_MESSAGE};
use tunebot_core::catalog::catalog_prompt_listing;
use tunebot_core::{
    AssistantReply, ChatError, CommandPlayer, Config, ConversationClient, DirCatalog, NullPlayer, OpenAIClient,
    PlaybackSink, Provider, TrackCatalog,
};

#[derive(Parser)]
#[command(name = "tunebot")]
#[command(about = "Music assistant: chat for song recommendations and read recognition results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Music folder (overrides the config file)
    #[arg(long, global = true, env = "TUNEBOT_MUSIC_DIR")]
    music_dir: Option<PathBuf>,

    /// Chat model (overrides the config file)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the music assistant (interactive)
    Chat,
    /// Ask the assistant a single question
    Ask {
        /// Your message
        message: String,
    },
    /// Show the best match from a saved recognition result
    Recognize {
        /// JSON result file (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// List tracks in the music folder
    Tracks,
    /// List known chat models
    Models {
        /// Store this model as the default
        #[arg(long)]
        set_default: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("⚠️  Could not read config ({}), using defaults", e);
        Config::new()
    });
    if let Some(dir) = cli.music_dir {
        config.music_dir = Some(dir);
    }
    if let Some(model) = cli.model {
        config.default_model = Some(model);
    }

    match cli.command {
        Commands::Chat => chat_interactive(&config).await?,
        Commands::Ask { message } => ask_once(&config, &message).await?,
        Commands::Recognize { file } => recognize(file).await?,
        Commands::Tracks => list_tracks(&config)?,
        Commands::Models { set_default } => list_models(&config, set_default.as_deref())?,
    }

    Ok(())
}

fn build_assistant(config: &Config) -> Result<ConversationClient> {
    let provider = config.provider();
    let api_key = config.api_key();
    if provider.requires_api_key() && api_key.is_none() {
        bail!(
            "{} API key not configured. Set OPENAI_API_KEY or add openai_api_key to {}",
            provider.display_name(),
            Config::get_config_path()?.display()
        );
    }

    let music_dir = config.music_dir();
    let transport = OpenAIClient::new(api_key.as_deref(), &config.endpoint())?;
    let player: Arc<dyn PlaybackSink> = match &config.player_command {
        Some(command) => Arc::new(CommandPlayer::new(command, &music_dir)?),
        None => Arc::new(NullPlayer),
    };
    debug!(endpoint = %transport.endpoint(), music_dir = %music_dir.display(), "Assistant ready");

    let client = ConversationClient::new(
        Arc::new(transport),
        Arc::new(DirCatalog::new(music_dir)),
        config.assistant_settings(),
    );
    Ok(client.with_player(player))
}

async fn chat_interactive(config: &Config) -> Result<()> {
    let mut client = build_assistant(config)?;

    println!("\n🎵 {}", WELCOME_MESSAGE);
    println!("Commands: /suggest, /clear, /quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                client.clear();
                println!("🧹 Conversation cleared\n");
                continue;
            }
            "/suggest" => {
                print_suggestions();
                continue;
            }
            _ => {}
        }

        let message = match input.parse::<usize>() {
            Ok(n) if (1..=SUGGESTED_QUESTIONS.len()).contains(&n) => SUGGESTED_QUESTIONS[n - 1],
            _ => input,
        };

        // Already shown to the user; keep chatting
        let _ = exchange(&mut client, message).await;
    }

    Ok(())
}

async fn ask_once(config: &Config, message: &str) -> Result<()> {
    let mut client = build_assistant(config)?;
    exchange(&mut client, message).await?;
    Ok(())
}

/// Prints the exchange; the error is returned after it has been shown
async fn exchange(client: &mut ConversationClient, message: &str) -> Result<(), ChatError> {
    println!("你: {}", message);
    println!("音乐管家: 思考中...");

    let outcome = client.send(message).await;
    print!("{}", render_outcome(&outcome));
    outcome.map(|_| ())
}

fn render_outcome(outcome: &Result<AssistantReply, ChatError>) -> String {
    match outcome {
        Ok(reply) => {
            let mut out = format!("音乐管家: {}\n\n", reply.content);
            if let Some(track) = &reply.played {
                out.push_str(&format!("▶️  Now playing: {}\n\n", track));
            } else if let Some(track) = reply.recommendations.first() {
                out.push_str(&format!("🎶 Recommended from your library: {}\n\n", track));
            }
            out
        }
        Err(e) => format!("音乐管家: 抱歉，我遇到了问题: {}\n\n", e),
    }
}

fn print_suggestions() {
    println!("\n💡 Try one of these (type the number):");
    for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
    println!();
}

async fn recognize(file: Option<PathBuf>) -> Result<()> {
    let raw = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };

    print!("{}", tunebot_core::reduce(&raw).display_text());
    Ok(())
}

fn list_tracks(config: &Config) -> Result<()> {
    let music_dir = config.music_dir();
    let tracks = DirCatalog::new(&music_dir).list_tracks()?;

    println!("\n📚 Tracks in {}", music_dir.display());
    println!("{}", "=".repeat(40));
    if tracks.is_empty() {
        println!("No tracks found");
    } else {
        for track in &tracks {
            println!("  • {}", track.file_name);
        }
        debug!("Prompt listing: {}", catalog_prompt_listing(&tracks));
    }

    Ok(())
}

fn list_models(config: &Config, set_default: Option<&str>) -> Result<()> {
    if let Some(model) = set_default {
        Config::save_default_model(model)?;
        println!("✅ Default model set to {}", model);
        return Ok(());
    }

    let provider = config.provider();
    println!("\n🤖 Models for {}", provider.display_name());
    println!("{}", "=".repeat(30));

    let current = config.assistant_settings().model;
    let models = match provider {
        Provider::OpenAI => OpenAIClient::list_models(),
        Provider::Ollama => vec![provider.default_model().to_string()],
    };
    for model in models {
        let marker = if model == current { "*" } else { " " };
        println!("{} {}", marker, model);
    }
    if provider == Provider::Ollama {
        println!("\nAny model pulled into Ollama can be used with --model");
    }

    Ok(())
}
