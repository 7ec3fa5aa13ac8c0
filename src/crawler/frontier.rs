//! Crawl frontier: the queue of discovered-but-unfetched URLs
//!
//! The frontier owns every [`UrlRecord`] for the run and is the only place
//! visited-state is mutated. The normalized URL is the dedup key: a record
//! is created at most once per normalized URL, which guarantees at-most-once
//! visitation regardless of worker count. Enqueue enforces the two hard
//! caps, `max_depth` and `max_pages`, making the frontier the engine's
//! flow-control point against runaway crawls.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use url::Url;

/// Lifecycle of one discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlState {
    Queued,
    Fetched,
    Errored,
    SkippedScope,
    SkippedRobots,
}

/// One record per unique normalized URL
#[derive(Debug, Clone)]
pub struct UrlRecord {
    /// The URL as discovered on the linking page
    pub raw: String,
    /// Normalized form; also the record's key in the frontier
    pub url: Url,
    pub depth: u32,
    /// Normalized URL of the page that linked here; None for seeds
    pub parent: Option<String>,
    pub state: UrlState,
    /// Frontier acceptance sequence; drives report ordering
    pub order: usize,
    pub error: Option<String>,
}

/// Result of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    AlreadySeen,
    TooDeep,
    CapReached,
}

/// A URL handed to a worker for processing
#[derive(Debug, Clone)]
pub struct ClaimedUrl {
    pub url: Url,
    pub normalized: String,
    pub depth: u32,
    pub order: usize,
}

/// FIFO-biased frontier with dedup and hard caps
#[derive(Debug)]
pub struct Frontier {
    records: HashMap<String, UrlRecord>,
    queue: VecDeque<String>,
    /// URLs accepted toward the max_pages cap (robots skips are refunded)
    accepted: usize,
    next_order: usize,
    max_pages: usize,
    max_depth: u32,
}

impl Frontier {
    pub fn new(max_pages: usize, max_depth: u32) -> Self {
        Self {
            records: HashMap::new(),
            queue: VecDeque::new(),
            accepted: 0,
            next_order: 0,
            max_pages,
            max_depth,
        }
    }

    /// Attempts to add a URL to the crawl
    ///
    /// No-op for already-seen normalized URLs. Depth overruns create a
    /// skipped record (they were discovered, and recording them dedups
    /// repeat sightings); cap overruns are dropped silently, as the frontier
    /// would otherwise grow without bound on link-dense sites.
    pub fn enqueue(
        &mut self,
        url: &Url,
        raw: &str,
        depth: u32,
        parent: Option<String>,
    ) -> EnqueueOutcome {
        let key = url.to_string();

        if self.records.contains_key(&key) {
            return EnqueueOutcome::AlreadySeen;
        }

        if depth > self.max_depth {
            self.insert_record(key, raw, url, depth, parent, UrlState::SkippedScope);
            return EnqueueOutcome::TooDeep;
        }

        if self.accepted >= self.max_pages {
            return EnqueueOutcome::CapReached;
        }

        self.insert_record(key.clone(), raw, url, depth, parent, UrlState::Queued);
        self.queue.push_back(key);
        self.accepted += 1;
        EnqueueOutcome::Queued
    }

    /// Records a URL rejected by the scope filter, without queueing it
    pub fn record_skipped_scope(&mut self, url: &Url, depth: u32, parent: Option<String>) {
        let key = url.to_string();
        if !self.records.contains_key(&key) {
            self.insert_record(key, url.as_str(), url, depth, parent, UrlState::SkippedScope);
        }
    }

    fn insert_record(
        &mut self,
        key: String,
        raw: &str,
        url: &Url,
        depth: u32,
        parent: Option<String>,
        state: UrlState,
    ) {
        let record = UrlRecord {
            raw: raw.to_string(),
            url: url.clone(),
            depth,
            parent,
            state,
            order: self.next_order,
            error: None,
        };
        self.next_order += 1;
        self.records.insert(key, record);
    }

    /// Claims the next queued URL, if any
    pub fn next(&mut self) -> Option<ClaimedUrl> {
        let key = self.queue.pop_front()?;
        let record = self.records.get(&key)?;
        Some(ClaimedUrl {
            url: record.url.clone(),
            normalized: key,
            depth: record.depth,
            order: record.order,
        })
    }

    pub fn mark_fetched(&mut self, normalized: &str) {
        if let Some(record) = self.records.get_mut(normalized) {
            record.state = UrlState::Fetched;
        }
    }

    pub fn mark_errored(&mut self, normalized: &str, error: String) {
        if let Some(record) = self.records.get_mut(normalized) {
            record.state = UrlState::Errored;
            record.error = Some(error);
        }
    }

    /// Marks a URL disallowed by robots.txt and refunds its cap slot:
    /// robots skips do not count toward max_pages
    pub fn mark_skipped_robots(&mut self, normalized: &str) {
        if let Some(record) = self.records.get_mut(normalized) {
            record.state = UrlState::SkippedRobots;
            self.accepted = self.accepted.saturating_sub(1);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Counts per terminal state, for the report summary
    pub fn counts(&self) -> FrontierCounts {
        let mut counts = FrontierCounts {
            discovered: self.records.len(),
            ..FrontierCounts::default()
        };
        for record in self.records.values() {
            match record.state {
                UrlState::Queued => counts.queued += 1,
                UrlState::Fetched => counts.fetched += 1,
                UrlState::Errored => counts.errored += 1,
                UrlState::SkippedScope => counts.skipped_scope += 1,
                UrlState::SkippedRobots => counts.skipped_robots += 1,
            }
        }
        counts
    }
}

/// Snapshot of record states
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontierCounts {
    pub discovered: usize,
    pub queued: usize,
    pub fetched: usize,
    pub errored: usize,
    pub skipped_scope: usize,
    pub skipped_robots: usize,
}
