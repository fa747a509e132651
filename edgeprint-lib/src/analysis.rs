use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use http::HeaderMap;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::collect::{self, HeaderFetcher, Target};
use crate::config::Config;
use crate::error::Result;
use crate::fingerprinting::headers::{first_value, forwarded_for, names, snapshot};
use crate::fingerprinting::{
    keep_alive_timeout, Detection, HeaderEvidenceCollector, HeaderStabilityComparator, Provider,
    ServerFingerprint, ServerFingerprinter, StabilityReport,
};
use crate::probe::{ConnectionProbe, ProbeOutcome};

/// Everything learned about one resolved address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpReport {
    pub ip: IpAddr,
    pub status: Option<u16>,
    pub tls_version: Option<String>,
    pub request_ms: Option<u64>,
    pub keep_alive_timeout: Option<String>,
    pub connection_header: Option<String>,
    pub server_header: Option<String>,
    pub powered_by_header: Option<String>,
    /// `X-Forwarded-For`, else `X-Real-IP`
    pub forwarded_header: Option<String>,
    pub real_ip_header: Option<String>,
    pub x_cache_header: Option<String>,
    /// Full response head, lower-case names
    pub response_headers: BTreeMap<String, Vec<String>>,
    pub detections: BTreeMap<Provider, Detection>,
    pub server: Option<ServerFingerprint>,
    pub connection: Option<ProbeOutcome>,
    /// Set when the header fetch failed; no other analysis is done then
    pub error: Option<String>,
}

impl IpReport {
    fn failed(ip: IpAddr, error: String) -> Self {
        Self {
            ip,
            status: None,
            tls_version: None,
            request_ms: None,
            keep_alive_timeout: None,
            connection_header: None,
            server_header: None,
            powered_by_header: None,
            forwarded_header: None,
            real_ip_header: None,
            x_cache_header: None,
            response_headers: BTreeMap::new(),
            detections: BTreeMap::new(),
            server: None,
            connection: None,
            error: Some(error),
        }
    }

    /// Providers detected on this IP.
    pub fn detected(&self) -> impl Iterator<Item = Provider> + '_ {
        self.detections.values().filter(|d| d.detected).map(|d| d.provider)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainReport {
    pub target: Target,
    /// Resolved addresses in resolver order
    pub ips: Vec<IpAddr>,
    /// Union of providers detected on any IP
    pub providers: BTreeSet<Provider>,
    pub stability: StabilityReport,
    pub results: Vec<IpReport>,
}

struct Services {
    fetcher: HeaderFetcher,
    probe: ConnectionProbe,
    evidence: HeaderEvidenceCollector,
    server: ServerFingerprinter,
}

/// Runs the whole pipeline for a target: resolve, fan out per IP, fold.
#[derive(Clone)]
pub struct Analyzer {
    services: Arc<Services>,
}

impl Analyzer {
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = HeaderFetcher::new(config.http.clone())?;
        let probe = ConnectionProbe::new(config.probe.clone(), Some(fetcher.connector().clone()));
        Ok(Self::with_services(fetcher, probe))
    }

    pub fn with_services(fetcher: HeaderFetcher, probe: ConnectionProbe) -> Self {
        Self {
            services: Arc::new(Services {
                fetcher,
                probe,
                evidence: HeaderEvidenceCollector::new(),
                server: ServerFingerprinter::new(),
            }),
        }
    }

    /// Parses and analyzes `input`. Fails only when the target is invalid or
    /// does not resolve; per-IP failures are recorded in the report.
    pub async fn analyze(&self, input: &str) -> Result<DomainReport> {
        let target = Target::parse(input)?;
        info!(input = %target, "analyzing");

        let ips = collect::resolve(&target.host, target.port).await?;
        info!(host = %target.host, count = ips.len(), "resolved addresses");

        Ok(self.analyze_ips(target, ips).await)
    }

    /// Analyzes already resolved addresses of `target`.
    pub async fn analyze_ips(&self, target: Target, ips: Vec<IpAddr>) -> DomainReport {
        let target = Arc::new(target);
        let mut tasks = JoinSet::new();

        for (index, ip) in ips.iter().copied().enumerate() {
            let services = Arc::clone(&self.services);
            let target = Arc::clone(&target);
            tasks.spawn(async move {
                let outcome = analyze_ip(&services, &target, ip).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<(IpReport, Option<HeaderMap>)>> = vec![None; ips.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(e) => warn!(error = %e, "analysis task failed"),
            }
        }

        let mut results = Vec::with_capacity(ips.len());
        let mut samples = Vec::new();
        for (ip, slot) in ips.iter().zip(slots) {
            match slot {
                Some((report, headers)) => {
                    samples.extend(headers);
                    results.push(report);
                }
                None => results.push(IpReport::failed(*ip, "analysis task aborted".to_string())),
            }
        }

        let stability = HeaderStabilityComparator::new().compare(&samples);
        let providers: BTreeSet<Provider> = results.iter().flat_map(|r| r.detected()).collect();

        let target = Arc::try_unwrap(target).unwrap_or_else(|shared| (*shared).clone());
        info!(
            domain = %target.host,
            providers = ?providers,
            different_headers = stability.any_difference(),
            "analysis complete"
        );

        DomainReport { target, ips, providers, stability, results }
    }
}

/// Fetch, classify and probe one IP. Returns the report and, on a successful
/// fetch, its headers for the stability fold.
async fn analyze_ip(
    services: &Services,
    target: &Target,
    ip: IpAddr,
) -> (IpReport, Option<HeaderMap>) {
    let fetched = match services.fetcher.fetch(target, ip).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(%ip, error = %e, "header fetch failed");
            return (IpReport::failed(ip, e.to_string()), None);
        }
    };

    let headers = fetched.headers;
    let detections = services.evidence.detect_all(&headers);
    let server = services.server.fingerprint(&headers);

    let addr = SocketAddr::new(ip, target.port);
    let outcome = services.probe.probe(addr, Some(&target.host)).await;
    if let Err(e) = &outcome {
        debug!(%addr, error = %e, "connection probe failed");
    }

    let report = IpReport {
        ip,
        status: Some(fetched.status.as_u16()),
        tls_version: fetched.tls_version,
        request_ms: Some(fetched.duration_ms),
        keep_alive_timeout: keep_alive_timeout(&headers),
        connection_header: header_value(&headers, names::CONNECTION),
        server_header: header_value(&headers, names::SERVER),
        powered_by_header: header_value(&headers, names::X_POWERED_BY),
        forwarded_header: forwarded_for(&headers),
        real_ip_header: header_value(&headers, names::X_REAL_IP),
        x_cache_header: header_value(&headers, names::X_CACHE),
        response_headers: snapshot(&headers),
        detections,
        server: Some(server),
        connection: Some(ProbeOutcome::from(outcome)),
        error: None,
    };

    (report, Some(headers))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    first_value(headers, name).map(|v| v.into_owned())
}
