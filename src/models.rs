use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU32, Ordering},
};
use uuid::Uuid;

/// Opaque per-session owner token. The only credential the system knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Mint a fresh, random owner token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A short link record held in the link store.
///
/// Identity, target, owner and timestamps never change after creation. The
/// two counters are atomics so that visit accounting and limit updates can
/// run concurrently against a shared record without a lock.
#[derive(Debug)]
pub struct ShortLink {
    pub short_code: String,
    pub original_url: String,
    pub owner: OwnerId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    max_visits: AtomicU32,
    current_visits: AtomicU32,
}

impl ShortLink {
    pub fn new(
        short_code: impl Into<String>,
        original_url: impl Into<String>,
        owner: OwnerId,
        max_visits: u32,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            short_code: short_code.into(),
            original_url: original_url.into(),
            owner,
            created_at,
            expires_at: created_at + ttl,
            max_visits: AtomicU32::new(max_visits),
            current_visits: AtomicU32::new(0),
        }
    }

    pub fn max_visits(&self) -> u32 {
        self.max_visits.load(Ordering::Acquire)
    }

    pub fn current_visits(&self) -> u32 {
        self.current_visits.load(Ordering::Acquire)
    }

    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_limit_reached(&self) -> bool {
        self.current_visits() >= self.max_visits()
    }

    /// Consume one visit if the budget allows it, returning the new visit
    /// count. Returns `None` when the limit is already reached; the counter
    /// is never pushed past `max_visits`.
    pub fn try_consume_visit(&self) -> Option<u32> {
        self.current_visits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |visits| {
                (visits < self.max_visits()).then_some(visits + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    pub fn set_max_visits(&self, max_visits: u32) {
        self.max_visits.store(max_visits, Ordering::Release);
    }

    /// Point-in-time view for listings.
    pub fn summary(&self, short_url: String) -> LinkSummary {
        LinkSummary {
            code: self.short_code.clone(),
            short_url,
            original_url: self.original_url.clone(),
            visits: self.current_visits(),
            max_visits: self.max_visits(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// `true` when `requester` owns `link`.
pub fn is_owner(link: &ShortLink, requester: &OwnerId) -> bool {
    link.owner == *requester
}

/// A listing row, used by both the shell and the JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub code: String,
    pub short_url: String,
    pub original_url: String,
    pub visits: u32,
    pub max_visits: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a successful consuming read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub original_url: String,
    pub visits: u32,
    pub max_visits: u32,
}
