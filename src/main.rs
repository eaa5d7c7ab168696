use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::info;

use voicechat::app::App;
use voicechat::notice::{self, NoticeKind, NoticeReceiver};
use voicechat::{
    handler, logging, tui, ui, BackendClient, ChatBackend, Config, Coordinator, GroqClient,
    Narrator, Provider, RodioOutput, SpeechClient, TurnOutcome,
};

#[derive(Parser)]
#[command(name = "voicechat")]
#[command(about = "Chat with an AI backend from the terminal, optionally narrated by ElevenLabs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base URL of the chat backend (serves POST /chat)
    #[arg(long, global = true, env = "VOICECHAT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Chat provider: "backend" or "groq"
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Start with narration turned off
    #[arg(long, global = true)]
    no_voice: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Your message
        message: String,
    },
    /// Read text aloud with the configured voice
    Say {
        /// Text to narrate
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(provider) = &cli.provider {
        if Provider::from_str(provider).is_none() {
            return Err(anyhow!("Unknown provider '{}'. Use 'backend' or 'groq'.", provider));
        }
        config.provider = Some(provider.clone());
    }
    if cli.no_voice {
        config.voice_enabled = false;
    }

    match cli.command {
        None => {
            logging::init_file(&Config::config_dir()?.join("voicechat.log"))?;
            run_tui(&config, !cli.no_voice).await
        }
        Some(Commands::Ask { message }) => {
            logging::init_stderr();
            ask(&config, message).await
        }
        Some(Commands::Say { text }) => {
            logging::init_stderr();
            say(&config, text).await
        }
    }
}

fn build_backend(config: &Config) -> Result<(Arc<dyn ChatBackend>, String)> {
    let timeout = config.request_timeout();
    match config.provider() {
        Provider::Backend => {
            let client = BackendClient::new(&config.backend_url, timeout);
            let label = client.base_url().to_string();
            Ok((Arc::new(client), label))
        }
        Provider::Groq => {
            let key = config
                .groq_api_key
                .as_deref()
                .ok_or_else(|| anyhow!("Groq API key not configured. Set GROQ_API_KEY."))?;
            let client = GroqClient::new(key, &config.groq_model, timeout);
            let label = client.model().to_string();
            Ok((Arc::new(client), label))
        }
    }
}

fn build_narrator(config: &Config) -> (Narrator, NoticeReceiver, RodioOutput) {
    let speech = SpeechClient::new(
        config.elevenlabs_api_key.as_deref(),
        &config.voice_id,
        config.request_timeout(),
    );
    let output = RodioOutput::new();
    let (tx, rx) = notice::channel();
    let narrator = Narrator::new(Arc::new(speech), Arc::new(output.clone()), tx);
    (narrator, rx, output)
}

async fn run_tui(config: &Config, persist_voice: bool) -> Result<()> {
    let (backend, label) = build_backend(config)?;
    let (narrator, notice_rx, _) = build_narrator(config);
    let coordinator = Coordinator::new(backend, narrator, config.voice_enabled);

    let mut app = App::new(coordinator, notice_rx, config.provider(), label);
    // --no-voice is a one-off; don't let it overwrite the saved setting
    app.persist_voice = persist_voice;

    info!(provider = config.provider().as_str(), "starting chat session");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(app.coordinator.subscribe_replies());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!("chat session ended");
    result
}

async fn ask(config: &Config, message: String) -> Result<()> {
    let (backend, _) = build_backend(config)?;
    let (narrator, mut notice_rx, output) = build_narrator(config);
    let mut coordinator = Coordinator::new(backend, narrator, config.voice_enabled);

    let mut input = message;
    if !coordinator.submit(&mut input) {
        return Err(anyhow!("Nothing to send: the message is empty."));
    }

    match coordinator.wait_for_reply().await {
        Some(TurnOutcome::Resolved { reply, narration }) => {
            println!("{}", reply);
            if let Some(handle) = narration {
                handle.await?;
                report_voice_errors(&mut notice_rx);
                tokio::task::spawn_blocking(move || output.wait_until_done()).await?;
            }
            Ok(())
        }
        Some(TurnOutcome::Failed { reason }) => Err(anyhow!("Error: {}", reason)),
        None => Err(anyhow!("No reply was requested")),
    }
}

async fn say(config: &Config, text: String) -> Result<()> {
    if text.trim().is_empty() {
        return Err(anyhow!("Nothing to say: the text is empty."));
    }

    let (narrator, mut notice_rx, output) = build_narrator(config);
    narrator.narrate(text).await?;
    report_voice_errors(&mut notice_rx);
    tokio::task::spawn_blocking(move || output.wait_until_done()).await?;
    Ok(())
}

fn report_voice_errors(notice_rx: &mut NoticeReceiver) {
    while let Ok(notice) = notice_rx.try_recv() {
        if notice.kind == NoticeKind::Error {
            eprintln!("{}", notice.text);
        }
    }
}
