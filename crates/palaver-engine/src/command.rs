//! Slash-command parsing for the general channel.
//!
//! Commands are matched case-insensitively and accept both the Spanish and
//! English verb (`/traducir` and `/translate` are the same command). A valid
//! command expands into a fully formed provider prompt; everything else maps
//! to a localized usage, redirect, or unknown-command outcome.

use palaver_core::i18n::MessageKey;

/// A successfully parsed slash command, with its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlashCommand {
    Translate { language: String, text: String },
    Explain { concept: String },
    Summarize { content: String },
}

impl SlashCommand {
    /// The provider prompt this command expands into.
    pub fn prompt(&self) -> String {
        match self {
            SlashCommand::Translate { language, text } => {
                format!("Translate the following text to {language}: \"{text}\"")
            }
            SlashCommand::Explain { concept } => {
                format!("Explain the concept of \"{concept}\" clearly and concisely.")
            }
            SlashCommand::Summarize { content } => {
                format!("Please summarize the following content or URL: \"{content}\"")
            }
        }
    }
}

/// Outcome of parsing a `/`-prefixed input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedCommand {
    /// A valid command to forward to the chat conversation.
    Valid(SlashCommand),
    /// Known command with missing arguments; the key names the usage string.
    Usage(MessageKey),
    /// `/imagine` in the text channel; answered locally with a redirect.
    Redirect,
    /// Unrecognized command verb, carried verbatim for the error message.
    Unknown(String),
}

/// Parse a slash command from raw input (leading `/` included).
pub fn parse_slash_command(input: &str) -> ParsedCommand {
    let body = input.trim().trim_start_matches('/');
    let mut parts = body.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match verb.to_lowercase().as_str() {
        "traducir" | "translate" => match args.split_first() {
            Some((language, rest)) if !rest.is_empty() => {
                ParsedCommand::Valid(SlashCommand::Translate {
                    language: (*language).to_string(),
                    text: rest.join(" "),
                })
            }
            _ => ParsedCommand::Usage(MessageKey::TranslateUsage),
        },
        "explicar" | "explain" => {
            if args.is_empty() {
                ParsedCommand::Usage(MessageKey::ExplainUsage)
            } else {
                ParsedCommand::Valid(SlashCommand::Explain {
                    concept: args.join(" "),
                })
            }
        }
        "resumir" | "summarize" => {
            if args.is_empty() {
                ParsedCommand::Usage(MessageKey::SummarizeUsage)
            } else {
                ParsedCommand::Valid(SlashCommand::Summarize {
                    content: args.join(" "),
                })
            }
        }
        "imaginar" | "imagine" => ParsedCommand::Redirect,
        _ => ParsedCommand::Unknown(verb.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
