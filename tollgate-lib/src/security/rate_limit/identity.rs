use std::net::{IpAddr, SocketAddr};

use http::HeaderMap;
use ipnet::IpNet;

use crate::config::{LimitBy, RateLimitConfig};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Derives the rate limiting identity of a request.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    limit_by: LimitBy,
    header: Option<String>,
    trusted_proxies: Vec<IpNet>,
}

impl IdentityResolver {
    pub fn new(limit_by: LimitBy, header: Option<String>, trusted_proxies: Vec<IpNet>) -> Self {
        Self {
            limit_by,
            header: header.map(|h| h.to_ascii_lowercase()),
            trusted_proxies,
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.limit_by, cfg.limit_by_header.clone(), cfg.trusted_proxies.clone())
    }

    /// Resolve the identity for a request from `peer` carrying `headers`.
    ///
    /// # Returns
    /// The header value in `LimitBy::Header` mode when present, otherwise the
    /// client IP address as a string
    pub fn resolve(&self, peer: SocketAddr, headers: &HeaderMap) -> String {
        if self.limit_by == LimitBy::Header {
            if let Some(value) = self
                .header
                .as_deref()
                .and_then(|name| headers.get(name))
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
            {
                return value.to_string();
            }
        }
        self.client_ip(peer, headers).to_string()
    }

    /// Client IP, honouring forwarding headers only from trusted proxies.
    pub fn client_ip(&self, peer: SocketAddr, headers: &HeaderMap) -> IpAddr {
        let peer_ip = peer.ip();
        if !self.is_trusted(peer_ip) {
            return peer_ip;
        }

        if let Some(ip) = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }

        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
            .unwrap_or(peer_ip)
    }

    fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(&ip))
    }
}
