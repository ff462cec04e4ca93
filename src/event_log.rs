use std::path::{Path, PathBuf};
use time::{OffsetDateTime, macros::format_description};
use tokio::io::AsyncWriteExt;

/// Append-only, timestamped record of what was sent and what failed.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `YYYY-MM-DD HH:MM:SS | text` entry. Write failures are
    /// only reported through tracing.
    pub async fn record(&self, text: &str) {
        let line = format!("{} | {}\n", timestamp(), text);
        if let Err(e) = self.append(&line).await {
            tracing::warn!(path = %self.path.display(), error = %e, "event log write failed");
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn timestamp() -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    now_local().format(&fmt).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path().join("ads_log.txt"));

        log.record("first").await;
        log.record("second").await;

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" | first"));
        assert!(lines[1].ends_with(" | second"));
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(lines[0].split(" | ").next().unwrap().len(), 19);
    }

    #[tokio::test]
    async fn unwritable_path_does_not_panic() {
        let log = EventLog::new("/definitely/not/a/dir/ads_log.txt");
        log.record("lost").await;
    }
}
