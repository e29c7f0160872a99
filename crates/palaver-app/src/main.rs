//! Palaver application binary - composition root.
//!
//! Ties the Palaver crates together into a terminal chat client:
//! 1. Load configuration from TOML
//! 2. Construct the provider (remote REST adapter, or mock with --mock)
//! 3. Initialize the orchestration engine (opens all workspace conversations)
//! 4. Run the line-based REPL, printing session updates as they land

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use palaver_audio::NullAudioSink;
use palaver_core::config::PalaverConfig;
use palaver_core::i18n::{self, Language};
use palaver_core::types::{AspectRatio, Channel, Message, MessageBody, Sender, WorkspaceId};
use palaver_engine::{ChatEngine, StateListener, Submission};
use palaver_provider::{GeminiProvider, MockProvider, Provider};

mod cli;
use cli::CliArgs;

/// Listener that queues changed sessions so the REPL can print their new
/// messages after each dispatch.
#[derive(Default)]
struct DirtySessions {
    queue: Mutex<Vec<(WorkspaceId, Channel)>>,
}

impl DirtySessions {
    fn drain(&self) -> Vec<(WorkspaceId, Channel)> {
        match self.queue.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl StateListener for DirtySessions {
    fn on_state_changed(&self, workspace: &WorkspaceId, channel: Channel) {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        let key = (workspace.clone(), channel);
        if !queue.contains(&key) {
            queue.push(key);
        }
    }
}

fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Ai => "ai",
    };
    match &message.body {
        MessageBody::Text(text) => format!("[{who}] {text}"),
        MessageBody::Error(text) => format!("[{who}:error] {text}"),
        MessageBody::Image(artifact) => format!(
            "[{who}] <image {}, {} bytes, ratio {}>",
            artifact.mime_type,
            artifact.bytes.len(),
            artifact.aspect_ratio.as_str()
        ),
    }
}

/// Print every message of a session the user has not seen yet.
fn print_unseen(
    engine: &ChatEngine,
    seen: &mut HashMap<(WorkspaceId, Channel), usize>,
    workspace: &WorkspaceId,
    channel: Channel,
    language: Language,
) {
    let Ok(history) = engine.history(workspace, channel) else {
        return;
    };
    let key = (workspace.clone(), channel);
    let already = seen.get(&key).copied().unwrap_or(0);
    for message in &history[already.min(history.len())..] {
        println!(
            "#{}/{} {}",
            workspace,
            i18n::channel_name(language, channel),
            format_message(message)
        );
    }
    seen.insert(key, history.len());
}

/// Match a user-typed channel name against the localized names.
fn parse_channel(name: &str) -> Option<Channel> {
    let lowered = name.trim_start_matches('#').to_lowercase();
    Channel::ALL.into_iter().find(|&channel| {
        i18n::channel_name(Language::Es, channel) == lowered
            || i18n::channel_name(Language::En, channel) == lowered
    })
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

fn print_help(language: Language) {
    println!("local commands:");
    println!("  /ws <id>        switch workspace");
    println!("  /ch <name>      switch channel");
    println!("  /ratio <r>      set default aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4)");
    println!("  /upload <path>  upload an image to the editor channel");
    println!("  /help           this help");
    println!("  /quit           exit");
    println!("channels:");
    for channel in Channel::ALL {
        println!("  #{}", i18n::channel_name(language, channel));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first; its log level is the fallback for tracing.
    let config_file = args.resolve_config_path();
    let mut config = PalaverConfig::load_or_default(&config_file);
    if let Some(lang) = &args.language {
        config.general.language = match lang.as_str() {
            "en" => Language::En,
            _ => Language::Es,
        };
    }

    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Palaver v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Provider.
    let provider: Arc<dyn Provider> = if args.mock {
        tracing::info!("Using in-memory mock provider");
        Arc::new(MockProvider::new())
    } else {
        match GeminiProvider::new(config.provider.clone()) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                tracing::error!(error = %e, "Failed to construct provider");
                eprintln!("provider setup failed: {e}");
                eprintln!(
                    "set the {} environment variable, or run with --mock",
                    config.provider.api_key_env
                );
                return Err(e.into());
            }
        }
    };

    // Engine.
    let listener = Arc::new(DirtySessions::default());
    let engine = ChatEngine::initialize(
        &config,
        provider,
        Arc::new(NullAudioSink),
        Arc::clone(&listener) as Arc<dyn StateListener>,
    )
    .await;

    let language = engine.language();
    let mut workspace = engine
        .workspaces()
        .first()
        .cloned()
        .ok_or("no workspaces configured")?;
    let mut channel = Channel::General;
    let mut seen: HashMap<(WorkspaceId, Channel), usize> = HashMap::new();

    // Show the welcome (or initialization error) before the first prompt.
    listener.drain();
    print_unseen(&engine, &mut seen, &workspace, channel, language);
    println!("(/help for local commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        let mut parts = input.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or("").trim();

        match verb {
            "/quit" | "/exit" => break,
            "/help" => {
                print_help(language);
                continue;
            }
            "/ws" => {
                let candidate = WorkspaceId::new(rest);
                if engine.workspaces().contains(&candidate) {
                    workspace = candidate;
                    print_unseen(&engine, &mut seen, &workspace, channel, language);
                } else {
                    println!(
                        "unknown workspace '{rest}' (have: {})",
                        engine
                            .workspaces()
                            .iter()
                            .map(|w| w.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
                continue;
            }
            "/ch" => {
                match parse_channel(rest) {
                    Some(parsed) => {
                        channel = parsed;
                        print_unseen(&engine, &mut seen, &workspace, channel, language);
                    }
                    None => println!("unknown channel '{rest}'"),
                }
                continue;
            }
            "/ratio" => {
                match AspectRatio::from_token(rest) {
                    Some(ratio) => {
                        engine.set_default_ratio(ratio);
                        println!("default ratio set to {}", ratio.as_str());
                    }
                    None => println!("unknown ratio '{rest}' (1:1, 16:9, 9:16, 4:3, 3:4)"),
                }
                continue;
            }
            "/upload" => {
                let path = Path::new(rest);
                match std::fs::read(path) {
                    Ok(bytes) => {
                        if let Err(e) =
                            engine.upload_image(&workspace, bytes, mime_for_path(path))
                        {
                            println!(
                                "{} {e}",
                                i18n::text(language, i18n::MessageKey::FileUploadError)
                            );
                        }
                    }
                    Err(e) => println!(
                        "{} {}: {e}",
                        i18n::text(language, i18n::MessageKey::FileUploadError),
                        path.display()
                    ),
                }
            }
            _ if !input.is_empty() => {
                match engine.submit(&workspace, channel, input).await {
                    Ok(Submission::Dispatched) => {}
                    Ok(Submission::Rejected(reason)) => {
                        tracing::debug!(?reason, "submission rejected");
                    }
                    Err(e) => println!("engine error: {e}"),
                }
            }
            _ => {}
        }

        for (dirty_workspace, dirty_channel) in listener.drain() {
            print_unseen(&engine, &mut seen, &dirty_workspace, dirty_channel, language);
        }
    }

    tracing::info!("Palaver shutting down");
    Ok(())
}
