//! Picking and shaping the text that gets sent.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::KakaoError;

/// Longest text the memo template accepts.
pub const MAX_MESSAGE_CHARS: usize = 2000;

pub const TRUNCATION_MARKER: &str = "\n\n... (message truncated)";

const TRUNCATION_RESERVE: usize = 50;

/// Resolves the message body: an explicit file first, then piped stdin, then
/// a generated test message.
pub fn resolve_message_source<R: Read>(
    path: Option<&Path>,
    stdin_is_terminal: bool,
    mut stdin: R,
) -> Result<String, KakaoError> {
    if let Some(path) = path {
        debug!(path = %path.display(), "reading message from file");
        let bytes = fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => KakaoError::FileNotFound(path.to_path_buf()),
            _ => KakaoError::Io(err),
        })?;
        return Ok(decode(bytes));
    }

    if !stdin_is_terminal {
        debug!("reading message from stdin");
        let mut bytes = Vec::new();
        stdin.read_to_end(&mut bytes)?;
        return Ok(decode(bytes));
    }

    Ok(default_message(Local::now()))
}

/// Invalid UTF-8 sequences become U+FFFD instead of failing the send.
fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

pub fn default_message(now: DateTime<Local>) -> String {
    format!(
        "📰 Morning Briefing Test\n\nThis is a test message.\n\nSent at: {}",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Cuts `message` down to `max_chars` characters, ending it with
/// [`TRUNCATION_MARKER`] when anything was dropped.
pub fn truncate(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }

    let keep = max_chars
        .saturating_sub(TRUNCATION_RESERVE)
        .min(max_chars.saturating_sub(TRUNCATION_MARKER.chars().count()));
    let mut truncated: String = message.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
