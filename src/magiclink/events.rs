//! In-memory log of recent authentication attempts.
//!
//! Entries are kept newest first, capped by count and pruned by age. Outcome
//! counters are monotonic until reset and are not affected by pruning.

use crate::magiclink::outcome::AuthOutcome;
use serde::Serialize;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info};
use ulid::Ulid;
use utoipa::ToSchema;

/// Upper bound for the configured log size, whatever the operator asks for.
pub const HARD_MAX_EVENT_LOG_SIZE: usize = 50_000;
pub const MIN_EVENT_LOG_SIZE: usize = 100;

/// Expired entries are pruned every this many recorded attempts.
const PRUNE_INTERVAL: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Success,
    Rejected,
    Timeout,
    Error,
    ParseError,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::ParseError => "parse_error",
        }
    }

    /// `timed_out` tells a client-side timeout apart from other transport errors.
    #[must_use]
    pub fn classify(outcome: &AuthOutcome, timed_out: bool) -> Self {
        match outcome {
            AuthOutcome::Accepted => Self::Success,
            AuthOutcome::Rejected(code) if code.contains("TIMEOUT") || code.contains("EXPIRED") => {
                Self::Timeout
            }
            AuthOutcome::Rejected(_) => Self::Rejected,
            AuthOutcome::TransportError(_) if timed_out => Self::Timeout,
            AuthOutcome::TransportError(_) => Self::Error,
            AuthOutcome::ParseError => Self::ParseError,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthEvent {
    /// ULID, also encodes `timestamp_ms`.
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Masked phone number, see [`mask_phone`].
    pub phone: String,
    pub outcome: EventKind,
    pub response_code: Option<String>,
    pub client_ip: Option<String>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl AuthEvent {
    #[must_use]
    pub fn new(
        phone: &str,
        outcome: &AuthOutcome,
        kind: EventKind,
        client_ip: Option<String>,
        duration: Duration,
        error: Option<String>,
    ) -> Self {
        let id = Ulid::new();
        Self {
            id: id.to_string(),
            timestamp_ms: id.timestamp_ms(),
            phone: mask_phone(phone),
            outcome: kind,
            response_code: outcome.response_code().map(str::to_string),
            client_ip,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Stats {
    pub total_attempts: u64,
    pub success: u64,
    pub rejected: u64,
    pub timeout: u64,
    pub errors: u64,
    pub parse_errors: u64,
    /// Entries currently held, after pruning.
    pub event_log_size: usize,
    pub event_log_max_size: usize,
    pub event_ttl_hours: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total_attempts: AtomicU64,
    success: AtomicU64,
    rejected: AtomicU64,
    timeout: AtomicU64,
    errors: AtomicU64,
    parse_errors: AtomicU64,
}

impl Counters {
    fn bump(&self, kind: EventKind) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            EventKind::Success => &self.success,
            EventKind::Rejected => &self.rejected,
            EventKind::Timeout => &self.timeout,
            EventKind::Error => &self.errors,
            EventKind::ParseError => &self.parse_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Stats {
        Stats {
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            ..Stats::default()
        }
    }

    fn reset(&self) {
        for counter in [
            &self.total_attempts,
            &self.success,
            &self.rejected,
            &self.timeout,
            &self.errors,
            &self.parse_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug)]
pub struct EventLog {
    max_size: usize,
    ttl: Duration,
    entries: Mutex<VecDeque<AuthEvent>>,
    counters: Counters,
    recorded: AtomicU64,
}

impl EventLog {
    /// `max_size` is clamped to `MIN_EVENT_LOG_SIZE..=HARD_MAX_EVENT_LOG_SIZE`
    /// and `ttl` to at least one second.
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size: max_size.clamp(MIN_EVENT_LOG_SIZE, HARD_MAX_EVENT_LOG_SIZE),
            ttl: ttl.max(Duration::from_secs(1)),
            entries: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
            recorded: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<AuthEvent>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, event: AuthEvent) {
        self.counters.bump(event.outcome);

        {
            let mut entries = self.entries();
            entries.push_front(event);
            entries.truncate(self.max_size);
        }

        if self.recorded.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            self.prune_expired();
        }
    }

    /// Drop entries older than the TTL, returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let cutoff = now_ms().saturating_sub(u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX));

        let mut pruned = 0;
        let mut entries = self.entries();
        while entries.back().is_some_and(|oldest| oldest.timestamp_ms < cutoff) {
            entries.pop_back();
            pruned += 1;
        }

        if pruned > 0 {
            debug!("pruned {} expired event log entries", pruned);
        }

        pruned
    }

    /// Newest first, expired entries excluded.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuthEvent> {
        self.prune_expired();
        self.entries().iter().take(limit).cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    /// Masked phone numbers with the most attempts in the log, most active first.
    #[must_use]
    pub fn top_phones(&self, limit: usize) -> Vec<(String, u64)> {
        self.prune_expired();

        let mut counts: HashMap<String, u64> = HashMap::new();
        for event in self.entries().iter() {
            *counts.entry(event.phone.clone()).or_default() += 1;
        }

        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.prune_expired();

        Stats {
            event_log_size: self.len(),
            event_log_max_size: self.max_size,
            event_ttl_hours: self.ttl.as_secs() / 3600,
            ..self.counters.snapshot()
        }
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
        info!("statistics counters reset");
    }

    #[cfg(test)]
    fn clear(&self) {
        self.entries().clear();
        info!("event log cleared");
    }
}

/// Keep only the last four characters, e.g. `+46701234567` -> `***4567`.
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let count = phone.chars().count();
    if count <= 4 {
        return "****".to_string();
    }

    let tail: String = phone.chars().skip(count - 4).collect();
    format!("***{tail}")
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
