use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

use crate::listing::Listing;

/// Listing ids that have already been notified, accumulated across runs.
///
/// Stored on disk as a JSON array of strings and always rewritten in full.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    ids: BTreeSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if the id was not present yet.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Loads the set from `path`. A missing or unreadable file, or one that
    /// isn't a JSON array of strings, yields an empty set.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no state file yet, starting empty");
                return Self::new();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "state file unreadable, starting empty");
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => {
                let set: Self = ids.into_iter().collect();
                tracing::debug!(path = %path.display(), seen = set.len(), "loaded state");
                set
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "state file malformed, starting empty");
                Self::new()
            }
        }
    }

    /// Overwrites `path` with the full set.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let ids: Vec<&str> = self.iter().collect();
        let json = serde_json::to_string_pretty(&ids).context("serialize seen ids")?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replace {}", path.display()))?;

        tracing::debug!(path = %path.display(), seen = self.len(), "saved state");
        Ok(())
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

// -------------------------
// Classification
// -------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    New,
    /// Not in the live set, but present in the snapshot taken at run start.
    Reappeared,
    Known,
}

impl Novelty {
    pub fn is_notifiable(self) -> bool {
        !matches!(self, Novelty::Known)
    }
}

/// Classifies listings against the seen set for the duration of one run.
///
/// `previous_seen` is frozen when the run begins while the live set keeps
/// growing. A listing only comes out `Reappeared` when the two have diverged,
/// which a normal run never causes; the flag annotates a notification and
/// never suppresses one.
#[derive(Debug)]
pub struct NoveltyTracker {
    previous_seen: SeenSet,
}

impl NoveltyTracker {
    pub fn begin(seen: &SeenSet) -> Self {
        Self {
            previous_seen: seen.clone(),
        }
    }

    pub fn classify(&self, listing: &Listing, seen: &SeenSet) -> Novelty {
        if seen.contains(&listing.id) {
            Novelty::Known
        } else if self.previous_seen.contains(&listing.id) {
            Novelty::Reappeared
        } else {
            Novelty::New
        }
    }

    pub fn record(&self, listing: &Listing, seen: &mut SeenSet) {
        seen.insert(listing.id.clone());
    }
}
