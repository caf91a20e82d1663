//! Avatar Context replay binary
//!
//! Feeds a JSONL transcript of chat messages through a `ContextManager` and
//! prints the final context, its analysis and the manager statistics as JSON.
//!
//! Each transcript line is a message object. Only `sender` and `content`
//! are required; `id` and `timestamp` are generated when missing. Blank
//! lines and lines starting with `#` are skipped.
//!
//! ```text
//! {"sender": "user", "content": "Hello!"}
//! {"sender": "assistant", "content": "Hi! How are you?"}
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use avatar_context::logging::init_logging;
use avatar_context::{ChatMessage, ContextManager, ContextSystemConfig, Sender};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "avatar-context")]
#[command(about = "Replay a chat transcript through the avatar context pipeline")]
struct Args {
    /// JSONL transcript; reads stdin when omitted
    transcript: Option<PathBuf>,

    /// Configuration file (.json, .yaml or .yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging level; defaults to the configured level
    #[arg(long)]
    log_level: Option<String>,

    /// Fetch the response context for this query after the replay
    #[arg(short, long)]
    query: Option<String>,

    /// Print one compact line per processed message
    #[arg(long)]
    each: bool,
}

/// One transcript line.
#[derive(Debug, Deserialize)]
struct TranscriptLine {
    id: Option<String>,
    sender: Sender,
    content: String,
    timestamp: Option<DateTime<Utc>>,
    metadata: Option<serde_json::Value>,
}

impl From<TranscriptLine> for ChatMessage {
    fn from(line: TranscriptLine) -> Self {
        let mut message = ChatMessage::new(line.sender, line.content);
        if let Some(id) = line.id {
            message.id = id;
        }
        if let Some(timestamp) = line.timestamp {
            message = message.with_timestamp(timestamp);
        }
        if let Some(metadata) = line.metadata {
            message = message.with_metadata(metadata);
        }
        message
    }
}

fn parse_transcript(reader: impl BufRead) -> Result<Vec<ChatMessage>> {
    let mut messages = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: TranscriptLine = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid message on line {}", index + 1))?;
        messages.push(parsed.into());
    }
    Ok(messages)
}

fn load_config(path: Option<&PathBuf>) -> Result<ContextSystemConfig> {
    let mut config = match path {
        Some(path) => ContextSystemConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ContextSystemConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn replay(
    manager: &mut ContextManager,
    messages: Vec<ChatMessage>,
    each: bool,
    out: &mut impl Write,
) -> Result<()> {
    for message in messages {
        let message_id = message.id.clone();
        let context = manager.process_message(message).await;
        if each {
            let line = json!({
                "message_id": message_id,
                "context_id": context.id,
                "emotion": context.immediate.current_emotion,
                "phase": context.immediate.flow.phase,
                "topics": context.immediate.active_topics,
            });
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

async fn report(manager: &mut ContextManager, query: Option<&str>) -> serde_json::Value {
    let context = match query {
        Some(query) => Some(manager.get_context_for_response(query).await),
        None => manager.current_context().cloned(),
    };
    let analysis = context.as_ref().map(|c| manager.analyze_context(c));
    let health = context.as_ref().map(|c| manager.perform_health_check(c));

    json!({
        "context": context,
        "analysis": analysis,
        "health": health,
        "summary": manager.summarize_conversation(),
        "stats": manager.get_context_stats(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    init_logging(args.log_level.as_deref().unwrap_or(&config.log_level));

    let messages = match &args.transcript {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open transcript {}", path.display()))?;
            parse_transcript(BufReader::new(file))?
        }
        None => parse_transcript(io::stdin().lock())?,
    };
    info!("Replaying {} messages", messages.len());

    let mut manager = ContextManager::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    replay(&mut manager, messages, args.each, &mut out).await?;

    let report = report(&mut manager, args.query.as_deref()).await;
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    manager.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_transcript_fills_missing_fields() {
        let input = r#"
# greeting
{"sender": "user", "content": "Hello!"}

{"id": "m-2", "sender": "assistant", "content": "Hi!", "timestamp": "2024-05-01T10:00:00Z"}
"#;
        let messages = parse_transcript(Cursor::new(input)).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].id.is_empty());
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].id, "m-2");
        assert_eq!(messages[1].timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_parse_transcript_reports_line() {
        let input = "{\"sender\": \"user\", \"content\": \"ok\"}\n{\"content\": \"no sender\"}\n";
        let err = parse_transcript(Cursor::new(input)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_config_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[tokio::test]
    async fn test_replay_writes_one_line_per_message() {
        let mut manager = ContextManager::new(ContextSystemConfig::default());
        let messages = vec![
            ChatMessage::user("I love jazz music"),
            ChatMessage::assistant("Me too!"),
        ];
        let mut out = Vec::new();
        replay(&mut manager, messages, true, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert!(first["topics"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t == "music"));

        let report = report(&mut manager, None).await;
        assert_eq!(report["stats"]["session"]["message_count"], 2);
        assert!(report["analysis"].is_object());
    }
}
