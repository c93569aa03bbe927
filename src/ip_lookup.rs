//! Public IP lookup over an ordered endpoint chain.
//!
//! Endpoints are tried strictly in order with a per-attempt timeout; the
//! first response that validates as an IP address wins. Individual failures
//! are debug-logged and swallowed; the caller sees an error only when the
//! whole chain is exhausted.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

use crate::error::AppError;

/// How an endpoint's response body carries the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// JSON object with an `ip` field.
    Json,
    /// The address alone in the body.
    Text,
    /// `key=value` lines, address under `ip=`.
    Trace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpEndpoint {
    pub url: String,
    pub kind: ProbeKind,
}

impl IpEndpoint {
    fn new(url: &str, kind: ProbeKind) -> Self {
        Self { url: url.to_string(), kind }
    }

    pub fn defaults() -> Vec<IpEndpoint> {
        vec![
            IpEndpoint::new("https://api.ipify.org?format=json", ProbeKind::Json),
            IpEndpoint::new("https://ifconfig.co/json", ProbeKind::Json),
            IpEndpoint::new("https://api.my-ip.io/ip.json", ProbeKind::Json),
            IpEndpoint::new("https://api.seeip.org/jsonip", ProbeKind::Json),
            IpEndpoint::new("https://api.ip.sb/ip", ProbeKind::Text),
            IpEndpoint::new("https://www.cloudflare.com/cdn-cgi/trace", ProbeKind::Trace),
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct IpReport {
    pub ip: String,
    pub source: String,
}

/// Ordered fallback over fallible async operations: run sequentially, return
/// the first success, aggregate every failure otherwise. The futures are
/// only polled when their turn comes.
pub async fn first_success<T>(
    attempts: Vec<(String, BoxFuture<'_, Result<T, AppError>>)>,
) -> Result<T, AppError> {
    let mut failures = Vec::new();
    for (label, attempt) in attempts {
        match attempt.await {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::debug!("Attempt {} failed: {}", label, e);
                failures.push(format!("{}: {}", label, e));
            }
        }
    }
    Err(AppError::IpLookup(if failures.is_empty() {
        "no endpoints configured".to_string()
    } else {
        failures.join("; ")
    }))
}

/// Queries the configured chain. Endpoints with unparseable URLs are skipped
/// up front.
pub async fn lookup(
    client: &reqwest::Client,
    endpoints: &[IpEndpoint],
    timeout_secs: u64,
) -> Result<IpReport, AppError> {
    let timeout = Duration::from_secs(timeout_secs);
    let attempts: Vec<(String, BoxFuture<'_, Result<IpReport, AppError>>)> = endpoints
        .iter()
        .filter(|ep| match Url::parse(&ep.url) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Skipping endpoint with invalid URL {:?}: {}", ep.url, e);
                false
            }
        })
        .map(|ep| {
            let label = ep.url.clone();
            (label, probe(client, ep, timeout).boxed())
        })
        .collect();

    first_success(attempts).await
}

async fn probe(
    client: &reqwest::Client,
    endpoint: &IpEndpoint,
    timeout: Duration,
) -> Result<IpReport, AppError> {
    log::debug!("Probing {}", endpoint.url);
    let response = client
        .get(&endpoint.url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;

    let ip = match endpoint.kind {
        ProbeKind::Json => {
            let body: serde_json::Value = response.json().await?;
            body.get("ip")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        }
        ProbeKind::Text => response.text().await?.trim().to_string(),
        ProbeKind::Trace => parse_trace(&response.text().await?).unwrap_or_default(),
    };

    if !is_valid_ip(&ip) {
        return Err(AppError::IpLookup(format!(
            "{} returned an unusable body",
            endpoint.url
        )));
    }
    Ok(IpReport { ip, source: endpoint.url.clone() })
}

fn parse_trace(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("ip="))
        .map(|v| v.trim().to_string())
}

fn is_valid_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}
