//! The `.env`-style token store shared by the acquirer and the sender.
//!
//! Writes rewrite the whole file: earlier token lines and generation comments
//! are dropped, every other line is kept as-is, and the fresh tokens are
//! appended under a new comment.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::config::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::{KakaoError, TokenRecord};

const GENERATED_COMMENT_PREFIX: &str = "# Kakao Tokens (Generated:";
const LOCK_ATTEMPTS: u32 = 20;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the stored tokens with `record`, returning once the new file
    /// content has been synced to disk.
    pub fn persist(&self, record: &TokenRecord) -> Result<(), KakaoError> {
        let _lock = StoreLock::acquire(&self.path)?;

        let current = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        let updated = apply_token_update(&current, record);
        write_synced(&resolve_target(&self.path)?, &updated)?;

        info!(path = %self.path.display(), "saved kakao tokens");
        Ok(())
    }
}

/// Pure rewrite of the store content for a new token record.
pub fn apply_token_update(content: &str, record: &TokenRecord) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in content.lines() {
        if is_token_line(line) {
            continue;
        }
        if line.trim().is_empty() && lines.last().is_some_and(|last| last.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|last| last.trim().is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|first| first.trim().is_empty()) {
        lines.remove(0);
    }

    let mut output = lines.join("\n");
    if !output.is_empty() {
        output.push_str("\n\n");
    }
    output.push_str(&generated_comment(record.issued_at));
    output.push('\n');
    output.push_str(&format!("{ACCESS_TOKEN_KEY}={}\n", record.access_token));
    output.push_str(&format!("{REFRESH_TOKEN_KEY}={}\n", record.refresh_token));
    output
}

fn is_token_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed).trim_start();
    trimmed.starts_with(GENERATED_COMMENT_PREFIX)
        || [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY].iter().any(|key| {
            trimmed
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        })
}

fn generated_comment(issued_at: DateTime<Utc>) -> String {
    format!(
        "{GENERATED_COMMENT_PREFIX} {})",
        issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// The file a write should land on: symlinks are followed so the link itself
/// survives the rename.
fn resolve_target(path: &Path) -> Result<PathBuf, KakaoError> {
    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(err.into()),
    }
}

fn write_synced(path: &Path, content: &str) -> Result<(), KakaoError> {
    let permissions = match fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    let tmp_path = sibling(path, "tmp");
    let written = (|| -> Result<(), KakaoError> {
        let mut file = File::create(&tmp_path)?;
        match permissions {
            Some(permissions) => file.set_permissions(permissions)?,
            // new stores hold credentials, keep them owner-only
            #[cfg(unix)]
            None => {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }
            #[cfg(not(unix))]
            None => {}
        }
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| ".env".into());
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

/// Exclusive lock file held for the duration of a read-modify-write. It
/// records the owner's pid; a lock older than [`STALE_LOCK_AGE`] is assumed to
/// belong to a process that died and is taken over.
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(store_path: &Path) -> Result<Self, KakaoError> {
        let path = sibling(store_path, "lock");
        for attempt in 1..=LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "removing stale token store lock");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    debug!(attempt, path = %path.display(), "token store locked, retrying");
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(KakaoError::StoreLocked(path))
    }
}

fn is_stale(lock_path: &Path) -> bool {
    fs::metadata(lock_path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
