use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use crate::event_log::{EventLog, now_local};
use crate::listing::{Listing, collect_listings};
use crate::notify::{Notifier, listing_message, no_new_listings_message};
use crate::novelty::{Novelty, NoveltyTracker, SeenSet};
use crate::search::origin_of;
use crate::source::PageSource;

/// Seven hours, the spacing between scheduled runs.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(7 * 60 * 60);

#[derive(Debug, Clone)]
pub struct NotifiedListing {
    pub listing: Listing,
    pub novelty: Novelty,
    pub delivered: bool,
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Listings that were new to this run, in page order.
    pub notified: Vec<NotifiedListing>,
    pub fragments: usize,
    pub rejected: usize,
    pub known: usize,
    pub status_sent: bool,
}

impl RunOutcome {
    pub fn new_count(&self) -> usize {
        self.notified.len()
    }

    pub fn failed_count(&self) -> usize {
        self.notified.iter().filter(|n| !n.delivered).count()
    }
}

/// Runs polling cycles: fetch the search page, build listings, notify the new
/// ones and persist the seen set.
pub struct Coordinator {
    source: Box<dyn PageSource>,
    notifier: Box<dyn Notifier>,
    events: EventLog,
    search_url: Url,
    state_path: PathBuf,
}

impl Coordinator {
    pub fn new(
        source: Box<dyn PageSource>,
        notifier: Box<dyn Notifier>,
        events: EventLog,
        search_url: Url,
        state_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            notifier,
            events,
            search_url,
            state_path: state_path.into(),
        }
    }

    /// One polling cycle against an explicitly owned seen set.
    ///
    /// A page fetch error aborts before `seen` is touched. Once listings are
    /// in hand every new id is recorded whether or not its notification went
    /// out, and the set is saved at the end regardless.
    pub async fn run_once(&self, seen: &mut SeenSet) -> Result<RunOutcome> {
        let tracker = NoveltyTracker::begin(seen);
        let base = origin_of(&self.search_url)?;

        tracing::info!(url = %self.search_url, seen = seen.len(), "starting run");
        let html = self
            .source
            .fetch_page(&self.search_url)
            .await
            .context("fetch search page")?;

        let page = collect_listings(&html, &base);

        let mut outcome = RunOutcome {
            fragments: page.fragments,
            rejected: page.rejected,
            ..Default::default()
        };

        for listing in page.listings {
            let novelty = tracker.classify(&listing, seen);
            if !novelty.is_notifiable() {
                outcome.known += 1;
                continue;
            }

            let reappeared = novelty == Novelty::Reappeared;
            let message = listing_message(&listing, reappeared);
            let delivered = self.deliver(&listing, &message).await;

            tracker.record(&listing, seen);
            outcome.notified.push(NotifiedListing {
                listing,
                novelty,
                delivered,
            });
        }

        if outcome.notified.is_empty() {
            outcome.status_sent = self.send_status().await;
        }

        seen.save(&self.state_path)
            .await
            .context("persist seen listings")?;

        tracing::info!(
            new = outcome.new_count(),
            failed = outcome.failed_count(),
            known = outcome.known,
            rejected = outcome.rejected,
            "run complete"
        );
        Ok(outcome)
    }

    /// Loads the seen set from disk and runs one cycle with it.
    pub async fn run_cycle(&self) -> Result<RunOutcome> {
        let mut seen = SeenSet::load(&self.state_path).await;
        self.run_once(&mut seen).await
    }

    /// Runs forever, one cycle per `interval`. A failed cycle is logged and
    /// the loop carries on with the next one.
    pub async fn poll(&self, interval: Duration) {
        loop {
            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = ?e, "run failed");
                self.events.record(&format!("Run failed: {e:#}")).await;
            }
            tracing::info!(secs = interval.as_secs(), "waiting for next run");
            sleep(interval).await;
        }
    }

    async fn deliver(&self, listing: &Listing, message: &str) -> bool {
        match self.notifier.send(message).await {
            Ok(receipt) => {
                tracing::info!(id = %listing.id, title = %listing.title, "notification sent");
                self.events
                    .record(&format!("Sent:\n{message}\n{receipt}"))
                    .await;
                true
            }
            Err(e) => {
                tracing::warn!(id = %listing.id, error = %e, "notification failed");
                self.events
                    .record(&format!("Send failed for {}: {e:#}", listing.id))
                    .await;
                false
            }
        }
    }

    async fn send_status(&self) -> bool {
        let message = no_new_listings_message(now_local());
        match self.notifier.send(&message).await {
            Ok(receipt) => {
                tracing::info!("no new listings");
                self.events.record(&format!("{message}\n{receipt}")).await;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "status notification failed");
                self.events
                    .record(&format!("Status send failed: {e:#}"))
                    .await;
                false
            }
        }
    }
}
