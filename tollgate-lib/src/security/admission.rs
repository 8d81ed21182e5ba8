use std::net::SocketAddr;
use std::sync::Arc;

use http::HeaderMap;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::security::rate_limit::{ClientLimiterTable, IdentityResolver, RateLimitResult};

/// Outcome of the admission check. Rejection is normal control flow, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Rate limiting is disabled, the table was not consulted.
    Bypassed,
    Rejected {
        identity: String,
        result: RateLimitResult,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Rejected { .. })
    }
}

/// Per-request admission decision backed by a [`ClientLimiterTable`].
#[derive(Clone)]
pub struct AdmissionControl {
    enabled: bool,
    table: Arc<ClientLimiterTable>,
    identity: IdentityResolver,
}

impl AdmissionControl {
    pub fn new(enabled: bool, table: Arc<ClientLimiterTable>, identity: IdentityResolver) -> Self {
        Self {
            enabled,
            table,
            identity,
        }
    }

    pub fn from_config(cfg: &RateLimitConfig, table: Arc<ClientLimiterTable>) -> Self {
        Self::new(cfg.enabled, table, IdentityResolver::from_config(cfg))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn table(&self) -> &Arc<ClientLimiterTable> {
        &self.table
    }

    /// Decide whether the request from `peer` may proceed.
    ///
    /// The table lock is released before the token is consumed, so requests
    /// from different clients are checked in parallel.
    pub fn check(&self, peer: SocketAddr, headers: &HeaderMap) -> Admission {
        if !self.enabled {
            return Admission::Bypassed;
        }

        let identity = self.identity.resolve(peer, headers);
        let bucket = self.table.get_or_create(&identity);

        match bucket.check() {
            RateLimitResult::Allowed { limit, remaining } => {
                debug!(%identity, limit, remaining, "rate limit check passed");
                Admission::Admitted
            }
            result @ RateLimitResult::Limited { .. } => {
                debug!(%identity, "rate limit exceeded");
                Admission::Rejected { identity, result }
            }
        }
    }
}
