//! Link lifecycle engine.
//!
//! Every rule about a link's life lives here: how it is created, when a read
//! consumes a visit, when it counts as expired, and who may change it. The
//! store underneath is a plain concurrent map; this layer decides what the
//! records in it mean.

use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    codegen::CodeGenerator,
    error::{LinkError, LinkResult},
    models::{is_owner, LinkSummary, OwnerId, ResolvedLink, ShortLink},
    store::LinkStore,
};

/// Settings the engine applies to every link it creates.
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    pub default_visit_limit: u32,
    pub ttl: chrono::Duration,
    /// Display prefix, always ending with `/`.
    pub display_domain: String,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            default_visit_limit: 5,
            ttl: chrono::Duration::minutes(1440),
            display_domain: "clck.ru/".into(),
        }
    }
}

pub struct LinkService {
    store: LinkStore,
    codes: CodeGenerator,
    policy: LinkPolicy,
    clock: Arc<dyn Clock>,
}

impl LinkService {
    pub fn new(store: LinkStore, policy: LinkPolicy) -> Self {
        Self {
            store,
            codes: CodeGenerator::default(),
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_code_generator(mut self, codes: CodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn store(&self) -> &LinkStore {
        &self.store
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Compose the displayed short link for a code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}{}", self.policy.display_domain, code)
    }

    /// Reduce a bare code or a displayed short link (with or without scheme)
    /// to the code itself.
    pub fn extract_code<'a>(&self, input: &'a str) -> &'a str {
        // The configured domain may carry its own scheme; compare both sides
        // without one.
        let domain = strip_scheme(&self.policy.display_domain);
        let input = strip_scheme(input.trim());
        input
            .strip_prefix(domain)
            .unwrap_or(input)
            .trim_matches('/')
    }

    /// Create a link owned by `owner` and return its code.
    ///
    /// A missing or non-positive `limit` falls back to the configured default.
    pub fn create(&self, url: &str, owner: OwnerId, limit: Option<i64>) -> LinkResult<String> {
        if url.trim().is_empty() {
            return Err(LinkError::InvalidInput("URL must not be empty".into()));
        }

        let max_visits = match limit {
            Some(limit) if limit > 0 => u32::try_from(limit).unwrap_or(u32::MAX),
            _ => self.policy.default_visit_limit,
        };

        // `generate` only checks existence; `insert_new` settles races between
        // concurrent creators drawing the same candidate.
        for _ in 0..self.codes.max_attempts() {
            let code = self.codes.generate(&self.store)?;
            let link = Arc::new(ShortLink::new(
                code.clone(),
                url,
                owner,
                max_visits,
                self.clock.now(),
                self.policy.ttl,
            ));

            if self.store.insert_new(link) {
                tracing::info!(
                    "Created short link '{}' (limit {}, owner {})",
                    code,
                    max_visits,
                    owner
                );
                return Ok(code);
            }
            tracing::debug!("Short code '{}' was claimed concurrently, retrying", code);
        }

        Err(LinkError::CodeSpaceExhausted {
            attempts: self.codes.max_attempts(),
        })
    }

    /// Consume one visit and return the target URL.
    ///
    /// An expired record is removed as a side effect of the failed read. A
    /// record whose quota is used up is left in place.
    pub fn resolve(&self, code_or_url: &str) -> LinkResult<ResolvedLink> {
        let code = self.extract_code(code_or_url);
        let link = self
            .store
            .get(code)
            .ok_or_else(|| LinkError::NotFound(code.to_owned()))?;

        if link.is_expired(self.clock.now()) {
            if self.store.remove_record(&link) {
                tracing::info!("Short link '{}' expired on access and was removed", code);
            }
            return Err(LinkError::Expired(code.to_owned()));
        }

        let visits = link.try_consume_visit().ok_or_else(|| {
            tracing::debug!("Short link '{}' refused: visit limit reached", code);
            LinkError::QuotaExceeded(code.to_owned())
        })?;

        Ok(ResolvedLink {
            original_url: link.original_url.clone(),
            visits,
            max_visits: link.max_visits(),
        })
    }

    /// Remove a link on behalf of its owner.
    pub fn delete(&self, code_or_url: &str, requester: &OwnerId) -> LinkResult<()> {
        let link = self.owned_link(code_or_url, requester)?;
        if !self.store.remove_record(&link) {
            // Evicted between the lookup and the removal.
            return Err(LinkError::NotFound(link.short_code.clone()));
        }
        tracing::info!("Short link '{}' deleted by its owner", link.short_code);
        Ok(())
    }

    /// Overwrite a link's visit limit on behalf of its owner.
    ///
    /// No floor is applied against the current visit count: lowering the limit
    /// below it makes the link unusable on its next resolve.
    pub fn update_limit(
        &self,
        code_or_url: &str,
        new_limit: i64,
        requester: &OwnerId,
    ) -> LinkResult<()> {
        if new_limit <= 0 {
            return Err(LinkError::InvalidInput(format!(
                "limit must be a positive integer, got {new_limit}"
            )));
        }
        let link = self.owned_link(code_or_url, requester)?;
        let new_limit = u32::try_from(new_limit).unwrap_or(u32::MAX);
        link.set_max_visits(new_limit);
        tracing::info!(
            "Short link '{}' visit limit set to {}",
            link.short_code,
            new_limit
        );
        Ok(())
    }

    /// Every link owned by `owner`, including exhausted ones. Unordered.
    pub fn list_for_owner(&self, owner: &OwnerId) -> Vec<Arc<ShortLink>> {
        self.store
            .list_all()
            .into_iter()
            .filter(|link| is_owner(link, owner))
            .collect()
    }

    /// Listing rows for `owner`, oldest first.
    pub fn summaries_for_owner(&self, owner: &OwnerId) -> Vec<LinkSummary> {
        let mut rows: Vec<LinkSummary> = self
            .list_for_owner(owner)
            .iter()
            .map(|link| link.summary(self.short_url(&link.short_code)))
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));
        rows
    }

    /// Evict every expired record and return how many were removed.
    ///
    /// Safe to run at any time, concurrently with anything else.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;
        for link in self.store.list_all() {
            if link.is_expired(now) && self.store.remove_record(&link) {
                tracing::info!(
                    "[sweep] Short link '{}' removed: expired at {}",
                    link.short_code,
                    link.expires_at
                );
                evicted += 1;
            }
        }
        evicted
    }

    fn owned_link(&self, code_or_url: &str, requester: &OwnerId) -> LinkResult<Arc<ShortLink>> {
        let code = self.extract_code(code_or_url);
        let link = self
            .store
            .get(code)
            .ok_or_else(|| LinkError::NotFound(code.to_owned()))?;
        if !is_owner(&link, requester) {
            tracing::warn!("Owner {} denied access to short link '{}'", requester, code);
            return Err(LinkError::Forbidden(code.to_owned()));
        }
        Ok(link)
    }
}

fn strip_scheme(s: &str) -> &str {
    s.strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s)
}
