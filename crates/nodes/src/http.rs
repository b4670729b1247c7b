//! Outbound HTTP for the `http` node: a zero-trust guard in front of
//! `reqwest`.
//!
//! Every hostname — including each hop of a redirect chain — is resolved
//! and checked against loopback/private/link-local/cloud-metadata ranges
//! before a connection is made. `reqwest`'s own redirect following is
//! disabled (`redirect::Policy::none()`) so the guard sees every hop.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::NodeError;

const DEFAULT_MAX_REDIRECTS: usize = 5;
const DEFAULT_MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Outbound-HTTP guardrails, configured once for the whole engine.
///
/// The four `block_*` flags are independent — enabling private-network
/// access for local dev testing (`block_private_ips: false`) must never
/// imply the cloud-metadata address is reachable too. Each flag is
/// checked on its own.
#[derive(Debug, Clone)]
pub struct HttpPolicy {
    /// When false (the default), every `http` node call is rejected before
    /// a connection is attempted — outbound HTTP is opt-in.
    pub allow_http: bool,
    /// Reject RFC 1918 / ULA private ranges.
    pub block_private_ips: bool,
    /// Reject loopback addresses (127.0.0.0/8, ::1).
    pub block_localhost: bool,
    /// Reject link-local addresses (169.254.0.0/16, fe80::/10) — this is
    /// also where the cloud-metadata address lives, but it's blocked
    /// independently via `block_cloud_metadata` so turning link-local off
    /// for, say, mDNS testing doesn't reopen it.
    pub block_link_local: bool,
    /// Reject the well-known cloud-metadata address (169.254.169.254 and
    /// its IPv6 equivalent) regardless of the other three flags.
    pub block_cloud_metadata: bool,
    /// When `Some`, only hosts matching one of these glob-style patterns
    /// (exact host, or `*.domain` suffix) may be contacted.
    pub allowed_url_patterns: Option<Vec<String>>,
    /// When `Some`, only these exact hostnames may be contacted.
    pub allowed_domains: Option<Vec<String>>,
    pub max_redirects: usize,
    pub max_response_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        HttpPolicy {
            allow_http: false,
            block_private_ips: true,
            block_localhost: true,
            block_link_local: true,
            block_cloud_metadata: true,
            allowed_url_patterns: None,
            allowed_domains: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            request_timeout: Duration::from_secs(30),
        }
    }
}

const CLOUD_METADATA_V4: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(169, 254, 169, 254));

fn is_cloud_metadata(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => IpAddr::V4(v4) == CLOUD_METADATA_V4,
        // fd00:ec2::254 (AWS) and fe80::... link-local metadata responders all fall
        // under the link-local check; IPv6 clouds that use a distinct ULA are caught here.
        IpAddr::V6(v6) => v6.segments() == [0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254],
    }
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 100 && (64..=127).contains(&v4.octets()[1]) // carrier-grade NAT
        }
        IpAddr::V6(v6) => v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00, // unique local
    }
}

fn is_loopback(ip: IpAddr) -> bool {
    ip.is_loopback()
}

fn is_link_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

fn blocked_reason(ip: IpAddr, policy: &HttpPolicy) -> Option<&'static str> {
    if policy.block_cloud_metadata && is_cloud_metadata(ip) {
        return Some("cloud-metadata address");
    }
    if policy.block_link_local && is_link_local(ip) {
        return Some("link-local address");
    }
    if policy.block_localhost && is_loopback(ip) {
        return Some("loopback address");
    }
    if policy.block_private_ips && is_private(ip) {
        return Some("private address");
    }
    None
}

fn url_pattern_allowed(host: &str, policy: &HttpPolicy) -> bool {
    match &policy.allowed_url_patterns {
        None => true,
        Some(patterns) => patterns.iter().any(|p| match p.strip_prefix("*.") {
            Some(suffix) => host == suffix || host.ends_with(&format!(".{suffix}")),
            None => p == host,
        }),
    }
}

fn host_allowed(host: &str, policy: &HttpPolicy) -> bool {
    let domain_ok = match &policy.allowed_domains {
        None => true,
        Some(allowed) => allowed
            .iter()
            .any(|d| d == host || host.ends_with(&format!(".{d}"))),
    };
    domain_ok && url_pattern_allowed(host, policy)
}

async fn check_host(host: &str, policy: &HttpPolicy) -> Result<(), NodeError> {
    if !host_allowed(host, policy) {
        return Err(NodeError::Http(format!("host '{host}' is not in the allowed-domains list")));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if let Some(reason) = blocked_reason(ip, policy) {
            return Err(NodeError::Http(format!("request to blocked {reason} '{ip}' rejected")));
        }
        return Ok(());
    }

    let lookup = format!("{host}:0");
    let addrs = tokio::net::lookup_host(lookup)
        .await
        .map_err(|e| NodeError::Http(format!("DNS resolution failed for '{host}': {e}")))?;

    let mut any = false;
    for addr in addrs {
        any = true;
        if let Some(reason) = blocked_reason(addr.ip(), policy) {
            return Err(NodeError::Http(format!(
                "host '{host}' resolves to blocked {reason} '{}'",
                addr.ip()
            )));
        }
    }
    if !any {
        return Err(NodeError::Http(format!("host '{host}' did not resolve to any address")));
    }
    Ok(())
}

/// Thin wrapper over a `reqwest::Client` configured to never auto-follow
/// redirects, so every hop can be re-screened.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client builds with static config");
        HttpClient { client }
    }

    pub async fn guarded_request(
        &self,
        method: &str,
        url: &str,
        headers: &std::collections::HashMap<String, String>,
        body: Option<&Value>,
        policy: &HttpPolicy,
    ) -> Result<Value, NodeError> {
        if !policy.allow_http {
            return Err(NodeError::Http("outbound HTTP is disabled by the active config".into()));
        }

        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| NodeError::BadConfig(format!("invalid HTTP method '{method}'")))?;

        let mut current_url = url.to_string();
        for hop in 0..=policy.max_redirects {
            let parsed = reqwest::Url::parse(&current_url)
                .map_err(|e| NodeError::BadConfig(format!("invalid URL '{current_url}': {e}")))?;
            let host = parsed
                .host_str()
                .ok_or_else(|| NodeError::BadConfig(format!("URL '{current_url}' has no host")))?
                .to_string();
            check_host(&host, policy).await?;

            let mut req = self.client.request(method.clone(), parsed).timeout(policy.request_timeout);
            for (k, v) in headers {
                req = req.header(k, v);
            }
            if let Some(b) = body {
                req = req.json(b);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| NodeError::Http(format!("request to '{current_url}' failed: {e}")))?;

            let status = resp.status();
            if status.is_redirection() {
                if hop == policy.max_redirects {
                    return Err(NodeError::Http(format!(
                        "redirect limit ({}) exceeded at '{current_url}'",
                        policy.max_redirects
                    )));
                }
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|h| h.to_str().ok())
                    .ok_or_else(|| NodeError::Http(format!("redirect from '{current_url}' had no Location header")))?;
                current_url = reqwest::Url::parse(&current_url)
                    .and_then(|base| base.join(location))
                    .map_err(|e| NodeError::Http(format!("invalid redirect target '{location}': {e}")))?
                    .to_string();
                continue;
            }

            return Self::read_body(resp, status, policy).await;
        }
        unreachable!("loop always returns or errors before exhausting max_redirects + 1 hops")
    }

    async fn read_body(mut resp: reqwest::Response, status: StatusCode, policy: &HttpPolicy) -> Result<Value, NodeError> {
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| NodeError::Http(format!("failed reading response body: {e}")))?
        {
            let room = policy.max_response_bytes.saturating_sub(buf.len());
            if chunk.len() > room {
                buf.extend_from_slice(&chunk[..room]);
                return Err(NodeError::Http(format!(
                    "response body exceeds cap of {} bytes and was truncated",
                    policy.max_response_bytes
                )));
            }
            buf.extend_from_slice(&chunk);
        }

        if !status.is_success() {
            return Err(NodeError::Http(format!(
                "request failed with status {status}: {}",
                String::from_utf8_lossy(&buf)
            )));
        }

        match serde_json::from_slice::<Value>(&buf) {
            Ok(v) => Ok(v),
            Err(_) => Ok(Value::String(String::from_utf8_lossy(&buf).into_owned())),
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
